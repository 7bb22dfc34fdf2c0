/// Remove a single leading and a single trailing `/`.
///
/// `"/users/"` becomes `"users"`, `"//a//"` becomes `"/a/"`.
#[must_use]
pub fn trim_slashes(path: &str) -> &str {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.strip_prefix('/').unwrap_or(path)
}

/// Clean a request url for matching: drop any `?query` suffix, then trim slashes.
#[must_use]
pub fn clean_request_path(url: &str) -> &str {
    let path = match url.find('?') {
        Some(pos) => &url[..pos],
        None => url,
    };
    trim_slashes(path)
}

/// Join a base path and a sub path with exactly one `/`, skipping empty sides.
#[must_use]
pub fn combine_urls(base: &str, sub: &str) -> String {
    let base = trim_slashes(base);
    let sub = trim_slashes(sub);

    match (base.is_empty(), sub.is_empty()) {
        (false, false) => format!("{base}/{sub}"),
        (true, _) => sub.to_string(),
        (false, true) => base.to_string(),
    }
}
