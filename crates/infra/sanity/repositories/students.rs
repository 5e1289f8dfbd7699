use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::{
        entities::students::{NewStudent, Student},
        repositories::students::StudentRepository,
    },
    infra::sanity::sanity_client::SanityClient,
};

pub struct StudentSanity {
    client: Arc<SanityClient>,
}

impl StudentSanity {
    pub fn new(client: Arc<SanityClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct StudentDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "externalId")]
    external_id: String,
    email: Option<String>,
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
}

impl From<StudentDoc> for Student {
    fn from(doc: StudentDoc) -> Self {
        Student {
            id: doc.id,
            external_id: doc.external_id,
            email: doc.email,
            first_name: doc.first_name,
            last_name: doc.last_name,
        }
    }
}

const STUDENT_BY_EXTERNAL_ID: &str = r#"*[_type == "student" && externalId == $externalId][0]{_id, externalId, email, firstName, lastName}"#;

#[async_trait]
impl StudentRepository for StudentSanity {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Student>> {
        let result = self
            .client
            .query(STUDENT_BY_EXTERNAL_ID, &[("externalId", external_id)])
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let doc: StudentDoc = serde_json::from_value(result)?;
        Ok(Some(doc.into()))
    }

    async fn create_if_not_exists(&self, student: NewStudent) -> Result<Student> {
        if let Some(existing) = self.find_by_external_id(&student.external_id).await? {
            return Ok(existing);
        }

        let doc_id = format!("student-{}", student.external_id);
        let mutation = json!({
            "createIfNotExists": {
                "_id": doc_id,
                "_type": "student",
                "externalId": student.external_id,
                "email": student.email,
                "firstName": student.first_name,
                "lastName": student.last_name,
                "imageUrl": student.image_url,
            }
        });

        self.client.mutate(vec![mutation], true).await?;

        Ok(Student {
            id: doc_id,
            external_id: student.external_id,
            email: Some(student.email),
            first_name: Some(student.first_name),
            last_name: Some(student.last_name),
        })
    }
}
