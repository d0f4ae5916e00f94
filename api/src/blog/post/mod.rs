pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod patch;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value as JsonValue};

use crate::{
    App,
    error::{ApiRequestError, AppError},
    json::JsonBody,
    storage::ImageStorage,
};

use super::models::blog::{NewBlog, UpdateBlog};

/// Name of the form field carrying the cover image, either as a file or as
/// the client's preview list.
const IMAGE_COVER_FIELD: &str = "imageCover";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BlogFormError {
    #[error("No title provided")]
    MissingTitle,

    #[error("Could not derive a slug from `{0}`")]
    EmptySlug(String),

    #[error("Invalid faqs, expected a JSON array of objects: {0}")]
    InvalidFaqs(String),
}

impl ApiRequestError for BlogFormError {}

/// A cover image file received with the form, not stored yet.
#[derive(Debug)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub async fn store(self, storage: &dyn ImageStorage) -> Result<String, AppError> {
        let location = storage
            .put(self.file_name.as_deref(), self.content_type.as_deref(), self.data)
            .await?;
        Ok(location)
    }
}

/// Removes a stored cover whose blog write failed. Failures are only logged
/// so the original error reaches the client.
pub async fn discard_upload(storage: &dyn ImageStorage, location: &str) {
    match storage.remove(location).await {
        Ok(_) => tracing::debug!(%location, "discarded cover of failed blog write"),
        Err(e) => {
            tracing::warn!(%location, error = %e, "could not discard cover of failed blog write")
        }
    }
}

/// Blog fields submitted on create and update, from either a multipart form
/// or a JSON body. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct BlogForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub heading: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub focus_keyword: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub faqs: Option<JsonValue>,
    pub image_cover: Option<JsonValue>,
    pub upload: Option<Upload>,
}

impl BlogForm {
    fn set_text(&mut self, name: &str, text: String) {
        match name {
            "title" => self.title = Some(text),
            "description" => self.description = Some(text),
            "keywords" => self.keywords = Some(text),
            "heading" => self.heading = Some(text),
            "excerpt" => self.excerpt = Some(text),
            "content" => self.content = Some(text),
            "focusKeyword" => self.focus_keyword = Some(text),
            "slug" => self.slug = Some(text),
            "category" => self.category = Some(text.trim().to_owned()),
            "faqs" => self.faqs = Some(JsonValue::String(text)),
            IMAGE_COVER_FIELD => {
                self.image_cover =
                    Some(serde_json::from_str(&text).unwrap_or(JsonValue::String(text)))
            }
            _ => {}
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = BlogForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            if name == IMAGE_COVER_FIELD && field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await?;

                // browsers send an empty part when no file was picked; only the
                // first file counts
                if !data.is_empty() && form.upload.is_none() {
                    form.upload = Some(Upload {
                        file_name,
                        content_type,
                        data,
                    });
                }
                continue;
            }

            let text = field.text().await?;
            form.set_text(&name, text);
        }

        Ok(form)
    }

    fn from_json(fields: Map<String, JsonValue>) -> Self {
        let mut form = BlogForm::default();

        for (name, value) in fields {
            match value {
                JsonValue::String(text) => form.set_text(&name, text),
                JsonValue::Null if name == "category" => form.category = Some(String::new()),
                JsonValue::Null => {}
                value if name == "faqs" => form.faqs = Some(value),
                value if name == IMAGE_COVER_FIELD => form.image_cover = Some(value),
                _ => {}
            }
        }

        form
    }

    fn parsed_faqs(&mut self) -> Result<Option<JsonValue>, BlogFormError> {
        match self.faqs.take() {
            Some(raw) => parse_faqs(raw),
            None => Ok(None),
        }
    }

    /// The record to insert. The cover image is filled in by the caller once
    /// the upload is stored.
    pub fn into_new_blog(mut self) -> Result<NewBlog, BlogFormError> {
        let faqs = self.parsed_faqs()?;

        let title = self
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(BlogFormError::MissingTitle)?;

        let slug_source = self
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| title.clone());
        let slug = slug::slugify(&slug_source);
        if slug.is_empty() {
            return Err(BlogFormError::EmptySlug(slug_source));
        }

        Ok(NewBlog {
            id: crate::utils::new_object_id(),
            title,
            description: self.description.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_default(),
            heading: self.heading.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            focus_keyword: self.focus_keyword.unwrap_or_default(),
            image_cover: None,
            faqs: faqs.unwrap_or_else(|| JsonValue::Array(vec![])),
            slug,
            category_id: self.category.filter(|c| !c.is_empty()),
        })
    }

    /// The changes to apply. A submitted `slug` is dropped, and the cover
    /// image is resolved by the caller.
    pub fn into_changes(mut self) -> Result<UpdateBlog, BlogFormError> {
        let faqs = self.parsed_faqs()?;

        let title = match self.title {
            Some(title) => {
                let title = title.trim().to_owned();
                if title.is_empty() {
                    return Err(BlogFormError::MissingTitle);
                }
                Some(title)
            }
            None => None,
        };

        if let Some(slug) = &self.slug {
            tracing::debug!(%slug, "ignoring slug in blog update");
        }

        Ok(UpdateBlog {
            title,
            description: self.description,
            keywords: self.keywords,
            heading: self.heading,
            excerpt: self.excerpt,
            content: self.content,
            focus_keyword: self.focus_keyword,
            image_cover: None,
            faqs,
            // a blank category clears it
            category_id: self.category.map(|c| Some(c).filter(|c| !c.is_empty())),
            updated_at: Some(chrono::Utc::now().naive_utc()),
        })
    }
}

impl FromRequest<App> for BlogForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &App) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| (rejection.body_text(), rejection.status()))?;
            BlogForm::from_multipart(multipart).await
        } else {
            let JsonBody(fields) =
                JsonBody::<Map<String, JsonValue>>::from_request(req, state).await?;
            Ok(BlogForm::from_json(fields))
        }
    }
}

/// Parses the `faqs` field, which arrives JSON-encoded in forms and either
/// encoded or inline in JSON bodies. A blank value counts as not submitted.
pub fn parse_faqs(raw: JsonValue) -> Result<Option<JsonValue>, BlogFormError> {
    let value = match raw {
        JsonValue::String(text) if text.trim().is_empty() => return Ok(None),
        JsonValue::String(text) => serde_json::from_str(&text)
            .map_err(|e| BlogFormError::InvalidFaqs(e.to_string()))?,
        value => value,
    };

    match &value {
        JsonValue::Array(items) if items.iter().all(JsonValue::is_object) => Ok(Some(value)),
        JsonValue::Array(_) => Err(BlogFormError::InvalidFaqs(
            "every entry must be an object".into(),
        )),
        _ => Err(BlogFormError::InvalidFaqs("not an array".into())),
    }
}

/// Picks the cover image for an update: a freshly uploaded file, else the
/// `preview` of the first entry of the submitted list, else what is stored.
pub fn resolve_image_cover(
    uploaded: Option<String>,
    submitted: Option<&JsonValue>,
    existing: Option<String>,
) -> Option<String> {
    uploaded
        .or_else(|| {
            submitted
                .and_then(|value| value.as_array())
                .and_then(|entries| entries.first())
                .and_then(|first| first.get("preview"))
                .and_then(JsonValue::as_str)
                .filter(|preview| !preview.is_empty())
                .map(str::to_owned)
        })
        .or(existing)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn faqs_are_parsed_from_encoded_strings() {
        let parsed = parse_faqs(json!(r#"[{"question":"Why?","answer":"Because."}]"#)).unwrap();
        assert_eq!(
            parsed,
            Some(json!([{ "question": "Why?", "answer": "Because." }]))
        );
    }

    #[test]
    fn inline_faqs_are_accepted() {
        let parsed = parse_faqs(json!([{ "question": "Q" }])).unwrap();
        assert_eq!(parsed, Some(json!([{ "question": "Q" }])));
    }

    #[test]
    fn blank_faqs_count_as_absent() {
        assert_eq!(parse_faqs(json!("")), Ok(None));
        assert_eq!(parse_faqs(json!("  ")), Ok(None));
    }

    #[test]
    fn malformed_faqs_are_rejected() {
        assert!(matches!(
            parse_faqs(json!("[{")),
            Err(BlogFormError::InvalidFaqs(_))
        ));
        assert!(matches!(
            parse_faqs(json!(r#"{"question":"Q"}"#)),
            Err(BlogFormError::InvalidFaqs(_))
        ));
        assert!(matches!(
            parse_faqs(json!(["just text"])),
            Err(BlogFormError::InvalidFaqs(_))
        ));
    }

    #[test]
    fn uploaded_cover_wins() {
        let submitted = json!([{ "preview": "https://cdn.example.com/preview.png" }]);
        assert_eq!(
            resolve_image_cover(
                Some("https://cdn.example.com/new.png".into()),
                Some(&submitted),
                Some("https://cdn.example.com/old.png".into()),
            )
            .as_deref(),
            Some("https://cdn.example.com/new.png")
        );
    }

    #[test]
    fn preview_wins_over_stored_cover() {
        let submitted = json!([
            { "preview": "https://cdn.example.com/first.png" },
            { "preview": "https://cdn.example.com/second.png" },
        ]);
        assert_eq!(
            resolve_image_cover(None, Some(&submitted), Some("old".into())).as_deref(),
            Some("https://cdn.example.com/first.png")
        );
    }

    #[test]
    fn stored_cover_is_kept_otherwise() {
        assert_eq!(
            resolve_image_cover(None, None, Some("old".into())).as_deref(),
            Some("old")
        );
        assert_eq!(
            resolve_image_cover(None, Some(&json!("plain string")), Some("old".into())).as_deref(),
            Some("old")
        );
        assert_eq!(
            resolve_image_cover(None, Some(&json!([])), None),
            None
        );
    }

    fn form() -> BlogForm {
        let mut form = BlogForm::default();
        form.set_text("title", "  Hello, World!  ".into());
        form.set_text("focusKeyword", "greeting".into());
        form.set_text("faqs", r#"[{"question":"Q","answer":"A"}]"#.into());
        form.set_text("unknown", "ignored".into());
        form
    }

    #[test]
    fn new_blog_derives_slug_from_title() {
        let blog = form().into_new_blog().unwrap();

        assert_eq!(blog.title, "Hello, World!");
        assert_eq!(blog.slug, "hello-world");
        assert_eq!(blog.focus_keyword, "greeting");
        assert_eq!(blog.faqs, json!([{ "question": "Q", "answer": "A" }]));
        assert!(crate::utils::is_object_id(&blog.id));
        assert_eq!(blog.category_id, None);
    }

    #[test]
    fn submitted_slug_is_normalized() {
        let mut form = form();
        form.set_text("slug", "My Custom Slug".into());
        assert_eq!(form.into_new_blog().unwrap().slug, "my-custom-slug");
    }

    #[test]
    fn new_blog_needs_a_title() {
        let mut form = form();
        form.set_text("title", "   ".into());
        assert_eq!(form.into_new_blog().unwrap_err(), BlogFormError::MissingTitle);
    }

    #[test]
    fn new_blog_defaults_faqs_to_empty_list() {
        let mut form = BlogForm::default();
        form.set_text("title", "Title".into());
        assert_eq!(form.into_new_blog().unwrap().faqs, json!([]));
    }

    #[test]
    fn changes_never_touch_the_slug_and_keep_unsent_faqs() {
        let mut form = BlogForm::default();
        form.set_text("slug", "new-slug".into());
        form.set_text("excerpt", "Updated".into());

        let changes = form.into_changes().unwrap();
        assert_eq!(changes.excerpt.as_deref(), Some("Updated"));
        assert_eq!(changes.faqs, None);
        assert_eq!(changes.title, None);
        assert!(changes.updated_at.is_some());
    }

    #[test]
    fn blank_category_means_none_on_create_and_clears_on_update() {
        let mut form = BlogForm::default();
        form.set_text("title", "Title".into());
        form.set_text("category", "  ".into());
        assert_eq!(form.into_new_blog().unwrap().category_id, None);

        let mut form = BlogForm::default();
        form.set_text("category", "".into());
        assert_eq!(form.into_changes().unwrap().category_id, Some(None));

        let mut form = BlogForm::default();
        form.set_text("category", "65a1f0c2e4b0a1b2c3d4e5aa".into());
        assert_eq!(
            form.into_changes().unwrap().category_id,
            Some(Some("65a1f0c2e4b0a1b2c3d4e5aa".to_owned()))
        );

        let unsent = BlogForm::default().into_changes().unwrap();
        assert_eq!(unsent.category_id, None);
    }

    #[test]
    fn json_null_category_clears_it() {
        let JsonValue::Object(fields) = json!({ "category": null }) else {
            unreachable!()
        };
        let changes = BlogForm::from_json(fields).into_changes().unwrap();
        assert_eq!(changes.category_id, Some(None));
    }

    #[test]
    fn json_body_maps_onto_the_same_fields() {
        let fields = json!({
            "title": "From JSON",
            "focusKeyword": "json",
            "faqs": [{ "question": "Q" }],
            "imageCover": [{ "preview": "https://cdn.example.com/p.png" }],
            "category": "",
            "views": 3,
        });
        let JsonValue::Object(fields) = fields else {
            unreachable!()
        };

        let form = BlogForm::from_json(fields);
        assert_eq!(form.title.as_deref(), Some("From JSON"));
        assert_eq!(form.focus_keyword.as_deref(), Some("json"));
        assert_eq!(form.faqs, Some(json!([{ "question": "Q" }])));
        assert_eq!(form.category.as_deref(), Some(""));
        assert_eq!(
            resolve_image_cover(None, form.image_cover.as_ref(), None).as_deref(),
            Some("https://cdn.example.com/p.png")
        );
    }

    #[test]
    fn preview_list_sent_as_form_text_is_decoded() {
        let mut form = BlogForm::default();
        form.set_text(
            IMAGE_COVER_FIELD,
            r#"[{"preview":"https://cdn.example.com/p.png"}]"#.into(),
        );
        assert_eq!(
            resolve_image_cover(None, form.image_cover.as_ref(), None).as_deref(),
            Some("https://cdn.example.com/p.png")
        );
    }
}
