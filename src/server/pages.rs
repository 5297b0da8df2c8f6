//! Server-rendered HTML views

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
};
use std::fmt::Write;
use crate::record::{StudentRecord, REQUIRED_FIELDS};
use crate::server::SharedState;
use crate::server::routes::ListParams;

type Page = (StatusCode, Html<String>);

/// Home page - record count and the full table
pub async fn index(State(state): State<SharedState>) -> Page {
    match state.store.list_all().await {
        Ok(students) => {
            let body = format!(
                "<h1>Student Records</h1>\n<p class=\"count\">{} students on record</p>\n{}",
                students.len(),
                student_table(&students, false)
            );
            (StatusCode::OK, Html(layout("Student Records", &body)))
        }
        Err(e) => error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Students page - the table with add, edit and delete controls, optionally
/// filtered by `?search=`
pub async fn students(State(state): State<SharedState>, Query(params): Query<ListParams>) -> Page {
    let result = match params.search.as_deref() {
        Some(term) => state.store.search(term).await,
        None => state.store.list_all().await,
    };

    match result {
        Ok(students) => {
            let term = params.search.as_deref().unwrap_or("");
            let body = format!(
                "<h1>Students</h1>\n\
                 <div id=\"alert\" class=\"alert\" role=\"status\" hidden></div>\n\
                 <div class=\"toolbar\">\
                 <form method=\"get\" action=\"/students\">\
                 <input type=\"search\" name=\"search\" value=\"{}\" placeholder=\"Name, email or city\">\
                 <button type=\"submit\">Search</button></form>\
                 <input type=\"text\" id=\"filter\" placeholder=\"Filter this page\">\
                 <button type=\"button\" id=\"add-student\">Add Student</button></div>\n{}\n{}\n\
                 <script src=\"/static/students.js\" defer></script>",
                escape(term),
                student_table(&students, true),
                student_dialog()
            );
            (StatusCode::OK, Html(layout("Students", &body)))
        }
        Err(e) => error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

pub async fn not_found() -> Page {
    error_page(StatusCode::NOT_FOUND, "Page not found")
}

fn error_page(status: StatusCode, message: &str) -> Page {
    let body = format!("<h1>Error</h1>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back to home</a></p>", escape(message));
    (status, Html(layout("Error", &body)))
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\n</head>\n<body>\n\
         <nav><a href=\"/\">Home</a> <a href=\"/students\">Students</a></nav>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape(title),
        body
    )
}

fn student_table(students: &[StudentRecord], actions: bool) -> String {
    if students.is_empty() {
        return "<p class=\"empty\">No students found.</p>".to_string();
    }

    let mut html = String::from(
        "<table id=\"students-table\">\n<thead><tr><th>ID</th><th>Name</th><th>Address</th><th>City</th>\
         <th>State</th><th>Email</th><th>Phone</th>",
    );
    if actions {
        html.push_str("<th></th>");
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for s in students {
        let _ = write!(
            html,
            "<tr data-id=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            s.id,
            s.id,
            escape(&s.name),
            escape(&s.address),
            escape(&s.city),
            escape(&s.state),
            escape(&s.email),
            escape(&s.phone)
        );
        if actions {
            html.push_str(
                "<td class=\"actions\"><button type=\"button\" data-action=\"edit\">Edit</button> \
                 <button type=\"button\" data-action=\"delete\">Delete</button></td>",
            );
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
}

/// Add/edit form, one required input per student field
fn student_dialog() -> String {
    let mut html = String::from(
        "<dialog id=\"student-dialog\">\n<form id=\"student-form\">\n\
         <h2 id=\"dialog-title\">Add Student</h2>\n<input type=\"hidden\" name=\"id\">\n",
    );
    for field in REQUIRED_FIELDS {
        let kind = match field {
            "email" => "email",
            "phone" => "tel",
            _ => "text",
        };
        let _ = writeln!(
            html,
            "<label>{}<input type=\"{}\" name=\"{}\" required></label>",
            title_case(field),
            kind,
            field
        );
    }
    html.push_str(
        "<div class=\"dialog-buttons\"><button type=\"submit\">Save</button> \
         <button type=\"button\" id=\"cancel-dialog\">Cancel</button></div>\n</form>\n</dialog>",
    );
    html
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escape text for element content and quoted attribute values
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StudentFields;
    use crate::storage::{RecordStore, SqliteStore};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_html(app: &Router, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;");
        assert_eq!(escape("O'Brien"), "O&#39;Brien");
    }

    #[tokio::test]
    async fn test_index_lists_seeded_students() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let app = crate::server::router(Arc::new(store), std::path::Path::new("static"));

        let (status, html) = get_html(&app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("10 students on record"));
        assert!(html.contains("Jane Smith"));
    }

    #[tokio::test]
    async fn test_students_page_escapes_and_filters() {
        let store = SqliteStore::open_in_memory().unwrap().with_seed(false);
        store.init_schema().await.unwrap();
        store
            .add(&StudentFields::new("<script>", "1 St", "Perth", "WA", "x@y.com", "1"))
            .await
            .unwrap();
        store
            .add(&StudentFields::new("Bob", "2 St", "Hobart", "TAS", "bob@y.com", "2"))
            .await
            .unwrap();
        let app = crate::server::router(Arc::new(store), std::path::Path::new("static"));

        let (status, html) = get_html(&app, "/students?search=perth").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Bob"));
    }

    #[tokio::test]
    async fn test_students_page_has_edit_controls() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        let app = crate::server::router(Arc::new(store), std::path::Path::new("static"));

        let (status, html) = get_html(&app, "/students").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<script src=\"/static/students.js\" defer></script>"));
        assert!(html.contains("id=\"add-student\""));
        assert!(html.contains("<tr data-id=\"1\">"));
        assert_eq!(html.matches("data-action=\"edit\"").count(), 10);
        assert_eq!(html.matches("data-action=\"delete\"").count(), 10);
        for field in REQUIRED_FIELDS {
            assert!(html.contains(&format!("name=\"{}\" required", field)), "missing input {}", field);
        }

        let (_, home) = get_html(&app, "/").await;
        assert!(!home.contains("data-action"));
    }

    #[tokio::test]
    async fn test_script_is_served() {
        let store = SqliteStore::open_in_memory().unwrap();
        let app = crate::server::router(Arc::new(store), std::path::Path::new("static"));

        let (status, js) = get_html(&app, "/static/students.js").await;

        assert_eq!(status, StatusCode::OK);
        assert!(js.contains("/api/students"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("address"), "Address");
        assert_eq!(title_case(""), "");
    }

    #[tokio::test]
    async fn test_unknown_page_is_404() {
        let store = SqliteStore::open_in_memory().unwrap();
        let app = crate::server::router(Arc::new(store), std::path::Path::new("static"));

        let (status, html) = get_html(&app, "/nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("Page not found"));
    }
}
