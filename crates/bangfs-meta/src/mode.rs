//! POSIX mode-bit helpers.

pub const S_IFMT: u32 = libc::S_IFMT as u32;
pub const S_IFDIR: u32 = libc::S_IFDIR as u32;
pub const S_IFREG: u32 = libc::S_IFREG as u32;

/// Whether the mode bits describe a directory.
pub fn is_dir(mode: u32) -> bool {
    mode & S_IFMT == S_IFDIR
}

/// Whether the mode bits describe a regular file.
pub fn is_file(mode: u32) -> bool {
    mode & S_IFMT == S_IFREG
}

/// Apply a chmod: the type bits are immutable after creation, only the
/// permission bits are replaced.
pub fn chmod(old: u32, incoming: u32) -> u32 {
    (old & S_IFMT) | (incoming & !S_IFMT)
}

/// Render mode bits as the familiar `drwxr-xr-x` string.
pub fn format_mode(mode: u32) -> String {
    let kind = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFREG => '-',
        _ => '?',
    };
    let rwx = |bits: u32| {
        let mut s = String::with_capacity(3);
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        s
    };
    format!(
        "{}{}{}{}",
        kind,
        rwx((mode >> 6) & 0o7),
        rwx((mode >> 3) & 0o7),
        rwx(mode & 0o7)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dir_is_file() {
        assert!(is_dir(S_IFDIR | 0o755));
        assert!(!is_dir(S_IFREG | 0o644));
        assert!(is_file(S_IFREG | 0o644));
        assert!(!is_file(S_IFDIR | 0o755));
    }

    #[test]
    fn test_chmod_preserves_type_bits() {
        let old = S_IFREG | 0o644;
        // An incoming mode carrying bogus type bits must not change the type.
        let new = chmod(old, S_IFDIR | 0o600);
        assert_eq!(new, S_IFREG | 0o600);
    }

    #[test]
    fn test_chmod_replaces_permissions() {
        let old = S_IFDIR | 0o755;
        assert_eq!(chmod(old, 0o700), S_IFDIR | 0o700);
    }

    #[test]
    fn test_format_mode() {
        assert_eq!(format_mode(S_IFDIR | 0o755), "drwxr-xr-x");
        assert_eq!(format_mode(S_IFREG | 0o644), "-rw-r--r--");
        assert_eq!(format_mode(S_IFREG | 0o000), "----------");
    }
}
