//! Known fixture container types.

use testbay_common::types::ContainerType;

/// Returns every fixture shipped with testbay.
#[must_use]
pub fn known() -> Vec<ContainerType> {
    vec![crate::sshd::container_type()]
}

/// Looks up a fixture by id (`sshd`) or display name (`SshdContainer`).
#[must_use]
pub fn lookup(id: &str) -> Option<ContainerType> {
    known()
        .into_iter()
        .find(|ty| ty.fixture_id() == id || ty.name().eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id_and_name() {
        assert_eq!(lookup("sshd"), Some(crate::sshd::container_type()));
        assert_eq!(lookup("sshdcontainer"), Some(crate::sshd::container_type()));
        assert_eq!(lookup("postgres"), None);
    }

    #[test]
    fn known_fixture_ids_are_unique() {
        let fixtures = known();
        for (i, a) in fixtures.iter().enumerate() {
            assert!(fixtures[i + 1..].iter().all(|b| b.fixture_id() != a.fixture_id()));
        }
    }
}
