//! Input limits and text helpers shared by the server and the stores.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use crate::{Error, Result};

/// Maximum length of a post, comment or direct message, in characters.
pub const MAX_CONTENT_CHARS: usize = 140;
pub const MAX_USERNAME_CHARS: usize = 32;
pub const MAX_POLL_OPTION_CHARS: usize = 80;
pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 4;
pub const MAX_URL_BYTES: usize = 2048;

static MENTION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention pattern compiles"));

/// Trim `text` and check it against the shared length limit.
///
/// When `allow_empty` is set an empty body is accepted (a post whose only
/// content is an image, for instance).
pub fn content(field: &'static str, text: &str, allow_empty: bool) -> Result<String> {
  let text = text.trim();
  if text.is_empty() && !allow_empty {
    return Err(Error::Empty { field });
  }
  if text.chars().count() > MAX_CONTENT_CHARS {
    return Err(Error::TooLong { field, max: MAX_CONTENT_CHARS });
  }
  Ok(text.to_owned())
}

pub fn username(name: &str) -> Result<String> {
  let name = name.trim();
  if name.is_empty() {
    return Err(Error::Empty { field: "username" });
  }
  if name.chars().count() > MAX_USERNAME_CHARS {
    return Err(Error::TooLong { field: "username", max: MAX_USERNAME_CHARS });
  }
  if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(Error::InvalidUsername);
  }
  Ok(name.to_owned())
}

/// Normalise an optional URL field. Blank strings count as absent.
pub fn optional_url(field: &'static str, url: Option<&str>) -> Result<Option<String>> {
  let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
    return Ok(None);
  };
  if url.len() > MAX_URL_BYTES
    || !(url.starts_with("https://") || url.starts_with("http://"))
  {
    return Err(Error::InvalidUrl { field });
  }
  Ok(Some(url.to_owned()))
}

/// Trim and check poll option labels: 2–4 non-empty, distinct labels.
pub fn poll_options(options: &[String]) -> Result<Vec<String>> {
  let options: Vec<String> = options
    .iter()
    .map(|o| o.trim())
    .filter(|o| !o.is_empty())
    .map(str::to_owned)
    .collect();

  if !(MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&options.len()) {
    return Err(Error::PollOptionCount {
      min: MIN_POLL_OPTIONS,
      max: MAX_POLL_OPTIONS,
    });
  }

  let mut seen = HashSet::new();
  for option in &options {
    if option.chars().count() > MAX_POLL_OPTION_CHARS {
      return Err(Error::TooLong {
        field: "poll option",
        max:   MAX_POLL_OPTION_CHARS,
      });
    }
    if !seen.insert(option.to_lowercase()) {
      return Err(Error::DuplicatePollOption(option.clone()));
    }
  }
  Ok(options)
}

/// Placeholder avatar for users who did not supply one.
pub fn default_avatar(username: &str) -> String {
  format!("https://api.dicebear.com/7.x/avataaars/svg?seed={username}")
}

/// Distinct `@name` mentions in order of first appearance.
pub fn mentions(text: &str) -> Vec<String> {
  let mut seen = HashSet::new();
  MENTION
    .captures_iter(text)
    .filter_map(|c| c.get(1))
    .map(|m| m.as_str().to_owned())
    .filter(|name| seen.insert(name.clone()))
    .collect()
}
