//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Derive a local filename from a remote URL: last path segment,
/// query string stripped. Falls back to a fixed name for pathless URLs.
pub fn filename_from_url(url: &str) -> String {
  let no_query = url.split('?').next().unwrap_or(url);
  let name = no_query.rsplit('/').next().unwrap_or("").trim();
  if name.is_empty() { "download".to_string() } else { name.to_string() }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
/// Cuts on a char boundary so multi-byte input never panics the caller.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_pairs() {
    let out = fill_template("a={a}, b={b}, a again={a}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "a=1, b=2, a again=1");
  }

  #[test]
  fn filename_strips_query_string() {
    assert_eq!(
      filename_from_url("https://cdn.example.com/uploads/photo_01.jpg?alt=media&token=abc"),
      "photo_01.jpg"
    );
    assert_eq!(filename_from_url("https://x.test/a/b/c.png"), "c.png");
  }

  #[test]
  fn filename_handles_pathless_urls() {
    assert_eq!(filename_from_url("https://x.test/?q=1"), "download");
  }

  #[test]
  fn trunc_backs_off_to_a_char_boundary() {
    // 119 ASCII bytes, then a 3-byte CJK char straddling byte 120.
    let mut s = "a".repeat(119);
    s.push('一');
    let out = trunc_for_log(&s, 120);
    assert!(out.starts_with(&"a".repeat(119)));
    assert!(out.contains("(122 bytes total)"));

    let url = format!("https://cdn.example.com/{}.jpg", "ü".repeat(100));
    let _ = trunc_for_log(&url, 120);
  }

  #[test]
  fn trunc_leaves_short_strings_alone() {
    assert_eq!(trunc_for_log("short", 120), "short");
  }
}
