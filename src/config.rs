//
// Compile-time configuration.
//
// lgq runs setuid root, so nothing here can be changed at runtime through
// the environment, arguments or a config file.
//

/// The Lustre mount that is queried. Set `LGQ_MOUNT_POINT` while building
/// to override.
pub const MOUNT_POINT: &str = match option_env!("LGQ_MOUNT_POINT") {
    Some(path) => path,
    None => "/lustre",
};

/// Upper bound on the number of users whose quota is fetched in one run.
pub const MAX_GROUP_MEMBERS: usize = 100;

/// Upper bound on the number of caller groups that are matched against.
pub const MAX_SUPPLEMENTARY_GROUPS: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_point_is_absolute() {
        assert!(MOUNT_POINT.starts_with('/'));
    }
}
