use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    domain::{entities::courses::Course, repositories::catalog::CourseCatalog},
    infra::sanity::sanity_client::SanityClient,
};

pub struct CourseSanity {
    client: Arc<SanityClient>,
}

impl CourseSanity {
    pub fn new(client: Arc<SanityClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CourseDoc {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    slug: Option<String>,
    description: Option<String>,
    price: Option<f64>,
    currency: Option<String>,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

const COURSE_BY_ID: &str = r#"*[_type == "course" && _id == $courseId][0]{_id, title, "slug": slug.current, description, price, currency, "imageUrl": image.asset->url}"#;

#[async_trait]
impl CourseCatalog for CourseSanity {
    async fn find_course_by_id(&self, course_id: &str) -> Result<Option<Course>> {
        let result = self
            .client
            .query(COURSE_BY_ID, &[("courseId", course_id)])
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let doc: CourseDoc = serde_json::from_value(result)?;
        Ok(Some(Course {
            id: doc.id,
            title: doc.title,
            slug: doc.slug,
            description: doc.description,
            price: doc.price,
            currency: doc.currency,
            image_url: doc.image_url,
        }))
    }
}
