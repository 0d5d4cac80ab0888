use bytes::Bytes;
use formpart::assemble::ImageEditRequest;
use formpart::policy::model;
use formpart::{Form, Named};
use futures_util::stream;
use std::convert::Infallible;

struct Part {
    name: Option<String>,
    file_name: Option<String>,
    content_type: Option<mime::Mime>,
    data: Bytes,
}

async fn decode(form: Form<Vec<u8>>) -> Vec<Part> {
    let boundary = formpart::parse_boundary(form.content_type()).unwrap();
    assert!(form.is_finished());

    let body = form.into_inner();
    let stream = stream::once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(body)) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().cloned();
        let data = field.bytes().await.unwrap();

        parts.push(Part {
            name,
            file_name,
            content_type,
            data,
        });
    }

    parts
}

#[tokio::test]
async fn test_round_trip_prompt_and_png() {
    let mut image = b"\x89PNG\r\n\x1a\n".to_vec();
    image.extend_from_slice(b"\0\0\0\rIHDR\r\n--not-a-boundary\r\n");

    let mut form = Form::new(Vec::new());
    form.add_field("prompt", "a cat").await.unwrap();
    form.add_file("image", &image[..], Some(""), None).await.unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    assert_eq!(parts.len(), 2);

    assert_eq!(parts[0].name.as_deref(), Some("prompt"));
    assert_eq!(parts[0].file_name, None);
    assert_eq!(parts[0].content_type, None);
    assert_eq!(&parts[0].data[..], b"a cat");

    assert_eq!(parts[1].name.as_deref(), Some("image"));
    assert_eq!(parts[1].file_name.as_deref(), Some("image.png"));
    assert_eq!(parts[1].content_type, Some(mime::IMAGE_PNG));
    assert_eq!(&parts[1].data[..], &image[..]);
}

#[tokio::test]
async fn test_parts_keep_insertion_order() {
    let mut form = Form::new(Vec::new());
    form.add_field("f1", "one").await.unwrap();
    form.add_field("f2", "two").await.unwrap();
    form.add_file("file1", &b"GIF89a"[..], Some("anim.gif"), None).await.unwrap();
    form.finish().await.unwrap();

    let names: Vec<_> = decode(form).await.into_iter().map(|p| p.name.unwrap()).collect();
    assert_eq!(names, ["f1", "f2", "file1"]);
}

#[tokio::test]
async fn test_default_name_for_webp() {
    let webp = b"RIFF\x1a\0\0\0WEBPVP8 \x0e\0\0\0payload";

    let mut form = Form::new(Vec::new());
    form.add_file("image", &webp[..], None, None).await.unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    assert_eq!(parts[0].file_name.as_deref(), Some("image.webp"));
    assert_eq!(parts[0].content_type.as_ref().map(|m| m.essence_str()), Some("image/webp"));
}

#[tokio::test]
async fn test_large_file_streams_intact() {
    let mut data = b"\xFF\xD8\xFF\xE0".to_vec();
    data.extend((0..300_000u32).map(|i| match i % 7 {
        0 => b'\r',
        1 => b'\n',
        2 | 3 => b'-',
        _ => (i % 251) as u8,
    }));

    let mut form = Form::new(Vec::new());
    form.add_named_file("image", Named::new("shots/big.jpeg", &data[..]), None)
        .await
        .unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].file_name.as_deref(), Some("big.jpeg"));
    assert_eq!(parts[0].content_type, Some(mime::IMAGE_JPEG));
    assert_eq!(parts[0].data.len(), data.len());
    assert!(parts[0].data[..] == data[..]);
}

#[tokio::test]
async fn test_edit_request_omits_unsupported_fields() {
    let request = ImageEditRequest {
        model: Some(model::GPT_IMAGE_1.to_owned()),
        quality: Some("hd".to_owned()),
        response_format: Some("url".to_owned()),
        size: Some("1024x1024".to_owned()),
        ..ImageEditRequest::new(&b"\x89PNG\r\n\x1a\nimage"[..], "add a hat")
    };

    let mut form = Form::new(Vec::new());
    request.write_to(&mut form).await.unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    let names: Vec<_> = parts.iter().map(|p| p.name.clone().unwrap()).collect();
    assert_eq!(names, ["image", "prompt", "model", "size"]);
    assert_eq!(&parts[2].data[..], b"gpt-image-1");
}

#[tokio::test]
async fn test_independent_forms_concurrently() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            tokio::spawn(async move {
                let mut form = Form::new(Vec::new());
                form.add_field("index", i.to_string()).await.unwrap();
                form.add_file("image", &b"BM\x1e\0\0\0"[..], None, None).await.unwrap();
                form.finish().await.unwrap();
                (i, decode(form).await)
            })
        })
        .collect();

    for handle in handles {
        let (i, parts) = handle.await.unwrap();
        assert_eq!(parts[0].data, Bytes::from(i.to_string()));
        assert_eq!(parts[1].file_name.as_deref(), Some("image.bmp"));
    }
}

#[cfg(feature = "tokio-io")]
#[tokio::test]
async fn test_tokio_reader() {
    let mut form = Form::new(Vec::new());
    form.add_tokio_file("image", &b"GIF87a"[..], None, None).await.unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    assert_eq!(parts[0].file_name.as_deref(), Some("image.gif"));
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_field() {
    #[derive(serde::Serialize)]
    struct Meta {
        tags: Vec<&'static str>,
    }

    let mut form = Form::new(Vec::new());
    form.add_json_field("meta", &Meta { tags: vec!["cat", "hat"] })
        .await
        .unwrap();
    form.finish().await.unwrap();

    let parts = decode(form).await;
    assert_eq!(&parts[0].data[..], br#"{"tags":["cat","hat"]}"#);
}
