//! Request bodies for the image upload operations.
//!
//! A [`FieldAssembler`] sits between a request and a [`Form`]: required
//! fields go straight through, optional ones only when
//! [`policy::should_include`] allows them for the target model.

use crate::policy::{self, field, Operation};
use crate::Form;
use futures_util::io::{AsyncRead, AsyncWrite};

/// Adds fields to a form on behalf of one operation and model.
pub struct FieldAssembler<'a, W> {
    form: &'a mut Form<W>,
    operation: Operation,
    model: &'a str,
}

impl<'a, W: AsyncWrite + Unpin> FieldAssembler<'a, W> {
    /// `model` may be empty when the request names no model.
    pub fn new(form: &'a mut Form<W>, operation: Operation, model: &'a str) -> Self {
        FieldAssembler {
            form,
            operation,
            model,
        }
    }

    /// The operation whose policy rows apply.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Adds `name` unconditionally.
    pub async fn required_field(&mut self, name: &str, value: &str) -> crate::Result<()> {
        self.form.add_field(name, value).await
    }

    /// Adds `name` if the policy allows it. Returns whether it was added.
    pub async fn field(&mut self, name: &str, value: &str) -> crate::Result<bool> {
        if !policy::should_include(self.operation, self.model, name, value) {
            trace!("skipping field '{}' for model '{}' on {:?}", name, self.model, self.operation);
            return Ok(false);
        }

        self.form.add_field(name, value).await?;
        Ok(true)
    }

    /// Adds a file part unconditionally, sniffing its content type.
    pub async fn required_file<R>(&mut self, name: &str, content: R) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.form.add_file(name, content, None, None).await
    }

    /// Adds a file part if one was given and the model accepts it. Returns
    /// whether it was added.
    pub async fn optional_file<R>(&mut self, name: &str, content: Option<R>) -> crate::Result<bool>
    where
        R: AsyncRead + Unpin,
    {
        let content = match content {
            Some(content) => content,
            None => return Ok(false),
        };

        if !policy::capability(self.operation, self.model).allows(name) {
            trace!("skipping file '{}' for model '{}' on {:?}", name, self.model, self.operation);
            return Ok(false);
        }

        self.form.add_file(name, content, None, None).await?;
        Ok(true)
    }
}

/// A request to edit an image, optionally restricted by a mask.
///
/// The mask may be a different reader type than the image, e.g. a
/// [`Named`](crate::Named) image with an anonymous mask; see
/// [`with_mask`](ImageEditRequest::with_mask).
#[derive(Debug)]
pub struct ImageEditRequest<R, M = R> {
    pub image: R,
    pub mask: Option<M>,
    pub prompt: String,
    pub model: Option<String>,
    pub n: Option<u32>,
    pub size: Option<String>,
    pub response_format: Option<String>,
    pub quality: Option<String>,
    pub user: Option<String>,
}

impl<R> ImageEditRequest<R> {
    /// A request with no mask and no optional fields set.
    pub fn new(image: R, prompt: impl Into<String>) -> Self {
        ImageEditRequest {
            image,
            mask: None,
            prompt: prompt.into(),
            model: None,
            n: None,
            size: None,
            response_format: None,
            quality: None,
            user: None,
        }
    }
}

impl<R, M> ImageEditRequest<R, M> {
    /// Replaces the mask, which may be of any reader type.
    pub fn with_mask<N>(self, mask: N) -> ImageEditRequest<R, N> {
        ImageEditRequest {
            image: self.image,
            mask: Some(mask),
            prompt: self.prompt,
            model: self.model,
            n: self.n,
            size: self.size,
            response_format: self.response_format,
            quality: self.quality,
            user: self.user,
        }
    }

    /// Endpoint path for edits.
    pub fn path(&self) -> &'static str {
        Operation::EditImage.path()
    }

    /// Writes every allowed field into `form`. The form is not finished.
    pub async fn write_to<W>(self, form: &mut Form<W>) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
        M: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let model = self.model.unwrap_or_default();
        let n = self.n.map(|n| n.to_string());
        let mut fields = FieldAssembler::new(form, Operation::EditImage, &model);

        fields.required_file(field::IMAGE, self.image).await?;
        fields.optional_file(field::MASK, self.mask).await?;
        fields.required_field(field::PROMPT, &self.prompt).await?;
        fields.field(field::MODEL, &model).await?;
        write_optional(&mut fields, field::N, n.as_deref()).await?;
        write_optional(&mut fields, field::SIZE, self.size.as_deref()).await?;
        write_optional(&mut fields, field::RESPONSE_FORMAT, self.response_format.as_deref()).await?;
        write_optional(&mut fields, field::QUALITY, self.quality.as_deref()).await?;
        write_optional(&mut fields, field::USER, self.user.as_deref()).await?;

        Ok(())
    }
}

/// A request for variations of an image.
#[derive(Debug)]
pub struct ImageVariationRequest<R> {
    pub image: R,
    /// Picks the capability row and the endpoint deployment. Not written to
    /// the body.
    pub model: Option<String>,
    pub n: Option<u32>,
    pub size: Option<String>,
    pub response_format: Option<String>,
}

impl<R: AsyncRead + Unpin> ImageVariationRequest<R> {
    /// A request with no optional fields set.
    pub fn new(image: R) -> Self {
        ImageVariationRequest {
            image,
            model: None,
            n: None,
            size: None,
            response_format: None,
        }
    }

    /// Endpoint path for variations.
    pub fn path(&self) -> &'static str {
        Operation::CreateVariation.path()
    }

    /// Writes every allowed field into `form`. The form is not finished.
    pub async fn write_to<W: AsyncWrite + Unpin>(self, form: &mut Form<W>) -> crate::Result<()> {
        let model = self.model.unwrap_or_default();
        let n = self.n.map(|n| n.to_string());
        let mut fields = FieldAssembler::new(form, Operation::CreateVariation, &model);

        fields.required_file(field::IMAGE, self.image).await?;
        write_optional(&mut fields, field::N, n.as_deref()).await?;
        write_optional(&mut fields, field::SIZE, self.size.as_deref()).await?;
        write_optional(&mut fields, field::RESPONSE_FORMAT, self.response_format.as_deref()).await?;

        Ok(())
    }
}

async fn write_optional<W: AsyncWrite + Unpin>(
    fields: &mut FieldAssembler<'_, W>,
    name: &str,
    value: Option<&str>,
) -> crate::Result<bool> {
    fields.field(name, value.unwrap_or_default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::model;
    use crate::Named;

    fn body_of(form: Form<Vec<u8>>) -> String {
        String::from_utf8_lossy(&form.into_inner()).into_owned()
    }

    fn names_in(body: &str) -> Vec<String> {
        body.match_indices("name=\"")
            .filter(|(idx, _)| !body[..*idx].ends_with("file"))
            .map(|(idx, m)| {
                let rest = &body[idx + m.len()..];
                rest[..rest.find('"').unwrap()].to_owned()
            })
            .collect()
    }

    fn edit_request(model: &str) -> ImageEditRequest<&'static [u8]> {
        ImageEditRequest {
            mask: Some(&b"\x89PNG\r\n\x1a\nmask"[..]),
            model: Some(model.to_owned()),
            n: Some(1),
            size: Some("1024x1024".to_owned()),
            response_format: Some("b64_json".to_owned()),
            quality: Some("high".to_owned()),
            user: Some("user-1".to_owned()),
            ..ImageEditRequest::new(&b"\x89PNG\r\n\x1a\nimage"[..], "a cat")
        }
    }

    #[tokio::test]
    async fn test_edit_for_gpt_image_1() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        edit_request(model::GPT_IMAGE_1).write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        let body = body_of(form);
        assert_eq!(names_in(&body), ["image", "mask", "prompt", "model", "n", "size", "user"]);
        assert!(!body.contains("quality"));
        assert!(!body.contains("response_format"));
    }

    #[tokio::test]
    async fn test_edit_for_dall_e_2() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        edit_request(model::DALL_E_2).write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        assert_eq!(
            names_in(&body_of(form)),
            ["image", "mask", "prompt", "model", "n", "size", "response_format", "quality", "user"]
        );
    }

    #[tokio::test]
    async fn test_edit_minimal() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        let request = ImageEditRequest::new(&b"\xFF\xD8\xFFjpeg"[..], "");
        assert_eq!(request.path(), "/images/edits");

        request.write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        let body = body_of(form);
        assert_eq!(names_in(&body), ["image", "prompt"]);
        assert!(body.contains("filename=\"image.jpg\"\r\nContent-Type: image/jpeg\r\n"));
    }

    #[tokio::test]
    async fn test_variation() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        let request = ImageVariationRequest {
            n: Some(2),
            response_format: Some("url".to_owned()),
            ..ImageVariationRequest::new(&b"GIF89a"[..])
        };
        assert_eq!(request.path(), "/images/variations");

        request.write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        assert_eq!(names_in(&body_of(form)), ["image", "n", "response_format"]);
    }

    #[tokio::test]
    async fn test_variation_body_has_no_model_or_user() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        let request = ImageVariationRequest {
            model: Some(model::DALL_E_2.to_owned()),
            size: Some("256x256".to_owned()),
            ..ImageVariationRequest::new(&b"\x89PNG\r\n\x1a\n"[..])
        };

        request.write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        let body = body_of(form);
        assert_eq!(names_in(&body), ["image", "size"]);
        assert!(!body.contains("dall-e-2"));
    }

    #[tokio::test]
    async fn test_edit_with_named_image_and_plain_mask() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        let image = Named::new("photos/cat.png", &b"\x89PNG\r\n\x1a\ncat"[..]);
        let request = ImageEditRequest::new(image, "a hat").with_mask(&b"\x89PNG\r\n\x1a\nmask"[..]);

        request.write_to(&mut form).await.unwrap();
        form.finish().await.unwrap();

        let body = body_of(form);
        assert_eq!(names_in(&body), ["image", "mask", "prompt"]);
        assert!(body.contains("name=\"mask\"; filename=\"mask.png\""));
    }

    #[tokio::test]
    async fn test_assembler_reports_skips() {
        let mut form = Form::with_boundary(Vec::new(), "B").unwrap();
        let mut fields = FieldAssembler::new(&mut form, Operation::EditImage, model::GPT_IMAGE_1);

        assert_eq!(fields.operation(), Operation::EditImage);
        assert_eq!(fields.field(field::QUALITY, "high").await, Ok(false));
        assert_eq!(fields.field(field::SIZE, "").await, Ok(false));
        assert_eq!(fields.field(field::SIZE, "512x512").await, Ok(true));
        assert_eq!(fields.optional_file::<&[u8]>(field::MASK, None).await, Ok(false));

        assert_eq!(form.parts_written(), 1);
    }
}
