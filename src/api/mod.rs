pub mod auth;
pub mod catalog;
pub mod contracts;
pub mod gateway;
pub mod users;

pub use gateway::{Gateway, RequestOptions};

use url::form_urlencoded;

/// Append query parameters, skipping unset ones. Returns `path` unchanged
/// when nothing is set.
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            any = true;
        }
    }

    if any {
        format!("{}?{}", path, serializer.finish())
    } else {
        path.to_string()
    }
}
