//! Server-rendered HTML for the landing page and the admin screens.

use axum::response::Html;
use std::fmt::Write;

use crate::db::{DashboardStats, Image, UploadPermission};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    )
}

fn alert(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<p class="{class}">{}</p>"#, escape(m)))
        .unwrap_or_default()
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Admin login</h1>
{error}
<form method="post" action="/login">
  <label>Username <input name="username" autocomplete="username" required></label>
  <label>Password <input name="password" type="password" autocomplete="current-password" required></label>
  <button type="submit">Log in</button>
</form>
<p><a href="/">Back to gallery</a></p>"#,
        error = alert("error", error),
    );
    page("Login", &body)
}

pub fn upload_page(error: Option<&str>, uploader_email: &str) -> String {
    let body = format!(
        r#"<h1>Upload image</h1>
{error}
<form method="post" action="/upload" enctype="multipart/form-data">
  <label>Title <input name="title" required></label>
  <label>Description <textarea name="description"></textarea></label>
  <label>Uploader email <input name="uploader_email" type="email" value="{email}" required></label>
  <label>File (JPG, max 5MB) <input name="file" type="file" accept=".jpg,.jpeg,image/jpeg" required></label>
  <button type="submit">Upload</button>
</form>
<p><a href="/admin">Back to dashboard</a></p>"#,
        error = alert("error", error),
        email = escape(uploader_email),
    );
    page("Upload", &body)
}

pub struct DashboardView<'a> {
    pub username: &'a str,
    pub stats: &'a DashboardStats,
    pub images: &'a [Image],
    pub permissions: &'a [UploadPermission],
    pub permission_error: Option<&'a str>,
    pub permission_success: Option<&'a str>,
}

pub fn dashboard_page(view: &DashboardView<'_>) -> String {
    let mut body = String::new();
    let stats = view.stats;

    let _ = write!(
        body,
        r#"<h1>Dashboard</h1>
<p>Logged in as <strong>{user}</strong> · <a href="/upload">Upload</a> · <a href="/logout">Log out</a></p>
<section>
  <p>Total images: <strong>{images}</strong></p>
  <p>Total likes: <strong>{likes}</strong></p>
</section>
"#,
        user = escape(view.username),
        images = stats.total_images,
        likes = stats.total_likes,
    );

    body.push_str("<h2>Top images</h2>\n<ol>\n");
    for top in &stats.top_images {
        let _ = writeln!(body, "  <li>{} ({} likes)</li>", escape(&top.title), top.likes);
    }
    body.push_str("</ol>\n<h2>Uploads per day</h2>\n<ul>\n");
    for day in &stats.upload_stats {
        let _ = writeln!(body, "  <li>{}: {}</li>", escape(&day.date), day.count);
    }
    body.push_str("</ul>\n");

    body.push_str("<h2>Upload permissions</h2>\n");
    body.push_str(&alert("error", view.permission_error));
    body.push_str(&alert("success", view.permission_success));
    body.push_str(
        r#"<form method="post" action="/admin/upload-permissions">
  <input name="upload_email" type="email" placeholder="email@example.com" required>
  <button type="submit">Allow</button>
</form>
<table>
<tr><th>Email</th><th>Added by</th><th>Added at</th><th></th></tr>
"#,
    );
    for entry in view.permissions {
        let _ = writeln!(
            body,
            r#"<tr><td>{email}</td><td>{by}</td><td>{at}</td><td><form method="post" action="/admin/upload-permissions/delete/{id}"><button type="submit">Remove</button></form></td></tr>"#,
            email = escape(&entry.email),
            by = escape(entry.created_by.as_deref().unwrap_or("")),
            at = escape(&entry.created_at),
            id = entry.id,
        );
    }
    body.push_str("</table>\n");

    body.push_str(
        "<h2>Images</h2>\n<table>\n<tr><th>Preview</th><th>Title</th><th>Likes</th><th>Uploaded</th><th></th></tr>\n",
    );
    for image in view.images {
        let _ = writeln!(
            body,
            r#"<tr><td><img src="/uploads/{file}" alt="{title}" width="80"></td><td>{title}</td><td>{likes}</td><td>{at}</td><td><form method="post" action="/delete/{id}"><button type="submit">Delete</button></form></td></tr>"#,
            file = escape(&image.filename),
            title = escape(&image.title),
            likes = image.likes,
            at = escape(&image.uploaded_at),
            id = image.id,
        );
    }
    body.push_str("</table>\n");

    page("Dashboard", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TopImage;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>'"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;&#x27;"
        );
    }

    #[test]
    fn test_upload_page_keeps_entered_email() {
        let html = upload_page(Some("Title is required"), "a@b.com\"><x");
        assert!(html.contains("Title is required"));
        assert!(html.contains(r#"value="a@b.com&quot;&gt;&lt;x""#));
    }

    #[test]
    fn test_dashboard_escapes_user_content() {
        let stats = DashboardStats {
            total_images: 1,
            total_likes: 2,
            top_images: vec![TopImage { title: "<b>".into(), likes: 2 }],
            upload_stats: vec![],
        };
        let images = vec![Image {
            id: 9,
            title: "<b>".into(),
            filename: "1-a.jpg".into(),
            description: None,
            likes: 2,
            uploaded_at: "2024-01-01 00:00:00".into(),
        }];
        let html = dashboard_page(&DashboardView {
            username: "admin1",
            stats: &stats,
            images: &images,
            permissions: &[],
            permission_error: Some("Email already allowed"),
            permission_success: None,
        });
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt; (2 likes)"));
        assert!(html.contains(r#"action="/delete/9""#));
        assert!(html.contains("Email already allowed"));
    }
}
