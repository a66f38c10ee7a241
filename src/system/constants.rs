//! Names and permission ranks reserved for the built-in `sys` database.

pub const DB_SYS: &str = "sys";
pub const BLOB_SYS_LOG: &str = "sys_log";
pub const BLOB_SYS_USER: &str = "sys_user";

pub const PERMISSION_READ: &str = "r";
pub const PERMISSION_READ_WRITE: &str = "rw";
pub const PERMISSION_READ_SUPER: &str = "*r";
pub const PERMISSION_SUPER: &str = "*rw";

/// Higher rank subsumes every permission a lower rank grants.
fn rank(permission: &str) -> u8 {
    match permission {
        PERMISSION_READ => 1,
        PERMISSION_READ_WRITE => 2,
        PERMISSION_READ_SUPER => 3,
        PERMISSION_SUPER => 4,
        _ => 0,
    }
}

pub fn has_read(permission: &str) -> bool {
    rank(permission) >= rank(PERMISSION_READ)
}

pub fn has_read_write(permission: &str) -> bool {
    rank(permission) >= rank(PERMISSION_READ_WRITE)
}

pub fn has_super_read(permission: &str) -> bool {
    rank(permission) >= rank(PERMISSION_READ_SUPER)
}

pub fn has_super(permission: &str) -> bool {
    rank(permission) >= rank(PERMISSION_SUPER)
}

/// True when `name` (a bare db name, or `db.blob`) refers to the reserved
/// system database or one of its blobs.
pub fn is_system_name(name: &str) -> bool {
    let items: Vec<&str> = name.split('.').collect();
    match items.as_slice() {
        [db] => *db == DB_SYS,
        [db, blob] => *db == DB_SYS && matches!(*blob, BLOB_SYS_LOG | BLOB_SYS_USER),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_ordering_holds() {
        assert!(has_super(PERMISSION_SUPER));
        assert!(has_super_read(PERMISSION_SUPER));
        assert!(!has_super(PERMISSION_READ_SUPER));
        assert!(has_read_write(PERMISSION_SUPER));
        assert!(!has_read_write(PERMISSION_READ));
    }

    #[test]
    fn system_name_detection() {
        assert!(is_system_name("sys"));
        assert!(is_system_name("sys.sys_user"));
        assert!(!is_system_name("shop.orders"));
    }
}
