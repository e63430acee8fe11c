//! Equipment profile records

use serde::Deserialize;

/// One entry of `get_profiles`, or the result of `get_profile`.
///
/// A record without an id gets `-1`, which never matches a real profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(default = "missing_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

fn missing_id() -> i64 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_list() {
        let profiles: Vec<Profile> = serde_json::from_value(json!([
            {"id": 1, "name": "Simulator"},
            {"id": 4, "name": "Backyard EQ6"},
            {"name": "No Id"}
        ]))
        .unwrap();

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[1], Profile { id: 4, name: "Backyard EQ6".to_string() });
        assert_eq!(profiles[2].id, -1);
    }
}
