//! Profile photos and fallback avatars

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared::models::Employee;

use crate::remote::{HttpRecordService, InMemoryRemoteService, RemoteResult};

/// Avatar background colours, picked by email hash
pub const AVATAR_PALETTE: [&str; 16] = [
    "#0078d4", "#00bcf2", "#40e0d0", "#008080", "#00c896", "#10893e", "#bad80a", "#ffb900",
    "#ff8c00", "#d13438", "#e3008c", "#b146c2", "#8764b8", "#744da9", "#486bba", "#0086bf",
];

/// Result of a photo lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoLookup {
    pub has_photo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl PhotoLookup {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(url: impl Into<String>) -> Self {
        Self {
            has_photo: true,
            photo_url: Some(url.into()),
        }
    }
}

/// Directory collaborator serving profile photos
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn get_user_photo(&self, email: &str, user_id: Option<u64>) -> RemoteResult<PhotoLookup>;
}

#[async_trait]
impl DirectoryService for HttpRecordService {
    async fn get_user_photo(&self, email: &str, _user_id: Option<u64>) -> RemoteResult<PhotoLookup> {
        Ok(match self.lookup_user_photo(email).await? {
            Some(url) => PhotoLookup::found(url),
            None => PhotoLookup::none(),
        })
    }
}

#[async_trait]
impl DirectoryService for InMemoryRemoteService {
    async fn get_user_photo(&self, email: &str, _user_id: Option<u64>) -> RemoteResult<PhotoLookup> {
        Ok(self
            .user_by_email(email)
            .and_then(|user| user.photo_url)
            .map(PhotoLookup::found)
            .unwrap_or_default())
    }
}

/// Cached photo lookups with a deterministic fallback
pub struct PhotoResolver {
    directory: Arc<dyn DirectoryService>,
    cache: DashMap<String, PhotoLookup>,
}

impl PhotoResolver {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self {
            directory,
            cache: DashMap::new(),
        }
    }

    /// Look up a photo once per email; failures count as "no photo"
    pub async fn lookup(&self, email: &str, user_id: Option<u64>) -> PhotoLookup {
        let key = email.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let lookup = match self.directory.get_user_photo(email, user_id).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::debug!(email, error = %e, "Photo lookup failed");
                PhotoLookup::none()
            }
        };

        self.cache.insert(key, lookup.clone());
        lookup
    }

    /// Photo URL or generated avatar for an employee
    pub async fn avatar_url(&self, employee: &Employee) -> String {
        if let Some(url) = &employee.photo_url {
            return url.clone();
        }

        match self.lookup(&employee.email, Some(employee.id)).await.photo_url {
            Some(url) => url,
            None => fallback_avatar(&employee.display_name, &employee.email),
        }
    }

    /// Resolve several avatars concurrently
    pub async fn avatar_urls(&self, employees: &[Employee]) -> Vec<String> {
        futures::future::join_all(employees.iter().map(|e| self.avatar_url(e))).await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

/// Up to two upper-case initials; `?` when the name is blank
pub fn initials(display_name: &str) -> String {
    let words: Vec<&str> = display_name.split_whitespace().collect();
    match words.as_slice() {
        [] => "?".to_string(),
        [single] => single.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Palette colour for an email (32-bit rolling hash over UTF-16 units)
pub fn avatar_color(email: &str) -> &'static str {
    let hash = email.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    AVATAR_PALETTE[(hash.unsigned_abs() % AVATAR_PALETTE.len() as u32) as usize]
}

/// SVG data URI with initials on a hash-selected colour
pub fn fallback_avatar(display_name: &str, email: &str) -> String {
    let svg = format!(
        r#"<svg width="40" height="40" viewBox="0 0 40 40" xmlns="http://www.w3.org/2000/svg"><circle cx="20" cy="20" r="20" fill="{}"/><text x="20" y="26" font-family="Segoe UI, system-ui, sans-serif" font-size="14" font-weight="600" text-anchor="middle" fill="white">{}</text></svg>"#,
        avatar_color(email),
        escape_xml(&initials(display_name)),
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DirectoryService for CountingDirectory {
        async fn get_user_photo(&self, email: &str, _user_id: Option<u64>) -> RemoteResult<PhotoLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RemoteError::Forbidden("no directory access".into()));
            }
            if email.starts_with("photo") {
                Ok(PhotoLookup::found(format!("https://photos.example.com/{}", email)))
            } else {
                Ok(PhotoLookup::none())
            }
        }
    }

    fn resolver(fail: bool) -> (Arc<CountingDirectory>, PhotoResolver) {
        let directory = Arc::new(CountingDirectory {
            calls: AtomicUsize::new(0),
            fail,
        });
        (directory.clone(), PhotoResolver::new(directory))
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Joana Maria Silva"), "JS");
        assert_eq!(initials("  pedro  "), "PE");
        assert_eq!(initials("X"), "X");
        assert_eq!(initials("   "), "?");
        assert_eq!(initials("élodie durand"), "ÉD");
    }

    #[test]
    fn test_avatar_color_is_deterministic() {
        assert_eq!(avatar_color("a"), "#00bcf2");
        assert_eq!(avatar_color("b"), "#40e0d0");
        assert_eq!(avatar_color(""), "#0078d4");
        assert_eq!(avatar_color("joana@example.com"), avatar_color("joana@example.com"));
    }

    #[test]
    fn test_fallback_avatar_is_svg_data_uri() {
        let uri = fallback_avatar("Joana Silva", "b");
        let encoded = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains(r##"fill="#40e0d0""##));
        assert!(svg.contains(">JS</text>"));
    }

    #[tokio::test]
    async fn test_lookups_are_cached_per_email() {
        let (directory, resolver) = resolver(false);

        let first = resolver.lookup("Photo@Example.com", None).await;
        let second = resolver.lookup("photo@example.com", Some(3)).await;
        assert!(first.has_photo);
        assert_eq!(first, second);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        resolver.clear_cache();
        assert_eq!(resolver.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_avatar_url_falls_back_on_missing_or_failed_lookup() {
        let (_, resolver) = resolver(false);
        let plain = Employee::new(1, "Rui Almeida", "rui@example.com");
        let with_photo = Employee::new(2, "Ana Lima", "photo-ana@example.com");

        let urls = resolver.avatar_urls(&[plain.clone(), with_photo]).await;
        assert_eq!(urls[0], fallback_avatar("Rui Almeida", "rui@example.com"));
        assert_eq!(urls[1], "https://photos.example.com/photo-ana@example.com");

        let (directory, failing) = self::resolver(true);
        assert!(failing.avatar_url(&plain).await.starts_with("data:image/svg+xml;base64,"));
        assert!(!failing.lookup("rui@example.com", None).await.has_photo);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_memory_directory_serves_registered_photos() {
        let remote = InMemoryRemoteService::new();
        let mut employee = Employee::new(5, "Carla Mendes", "carla@example.com");
        employee.photo_url = Some("https://photos.example.com/carla.jpg".into());
        remote.register_user(employee);

        let lookup = remote.get_user_photo("CARLA@example.com", None).await.unwrap();
        assert_eq!(lookup, PhotoLookup::found("https://photos.example.com/carla.jpg"));
        assert!(!remote.get_user_photo("nobody@example.com", None).await.unwrap().has_photo);
    }
}
