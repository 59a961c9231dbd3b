use rand::Rng;
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier for reports and SOS logs.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Anonymous installation identity, `anon_<millis>_<6 base36 chars>`.
pub fn new_profile_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("anon_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_ids_are_prefixed_and_distinct() {
        let first = new_profile_id();
        let second = new_profile_id();
        assert!(first.starts_with("anon_"));
        let suffix = first.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(first, second);
    }

    #[test]
    fn record_ids_are_uuids() {
        assert!(Uuid::parse_str(&new_record_id()).is_ok());
    }
}
