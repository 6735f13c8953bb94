//! UUIDv7 helpers for document and summary identifiers.
//!
//! Document ids are UUIDv7 so they sort by creation time, which keeps the
//! `created_at DESC, id DESC` list ordering stable when two uploads land in
//! the same millisecond.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use pdfbrief_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_version_7() {
        assert_eq!(new_v7().get_version_num(), 7);
    }

    #[test]
    fn test_new_v7_sorts_by_time() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(b > a);
    }
}
