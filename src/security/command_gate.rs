//! Command Safety Gate
//!
//! Classifies a shell command as blocked or allowed against a fixed, ordered
//! list of dangerous-pattern rules. This is a denylist: it stops the
//! enumerated classes of destructive commands and nothing more. Allowed
//! commands still run with the full privileges of the host process.

use lazy_static::lazy_static;
use regex::Regex;

/// A single denylist rule
#[derive(Debug)]
pub struct BlockRule {
    /// Short rule identifier (e.g. `recursive_delete`)
    pub name: &'static str,
    /// Human-readable description of the blocked class
    pub description: &'static str,
    /// Source regex, reported back in rejection messages
    pub pattern: &'static str,
    regex: Regex,
}

impl BlockRule {
    fn new(name: &'static str, description: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            description,
            pattern,
            // Patterns are compile-time constants covered by tests
            regex: Regex::new(pattern).unwrap(),
        }
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

lazy_static! {
    static ref BLOCK_RULES: Vec<BlockRule> = vec![
        BlockRule::new(
            "recursive_delete",
            "recursive delete",
            r"(?i)\brm\s+(?:[^\s;&|]+\s+)*?(?:-[a-z]*r[a-z]*|--recursive)(?:\s|$)",
        ),
        BlockRule::new(
            "sudo_remove",
            "privileged remove",
            r"(?i)\bsudo\s+(?:-\S+\s+)*rm\b",
        ),
        BlockRule::new(
            "filesystem_format",
            "filesystem format utility",
            r"(?i)\b(?:mkfs(?:\.[a-z0-9]+)?|mke2fs|mkswap|wipefs|fdisk)\b|\bdiskutil\s+(?:erase\w*|partitiondisk)\b",
        ),
        BlockRule::new(
            "raw_disk_write",
            "raw disk write with dd",
            r"(?i)\bdd\b[^|;&]*\bof=/dev/",
        ),
        BlockRule::new(
            "fork_bomb",
            "fork bomb",
            r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        ),
        BlockRule::new(
            "permission_change",
            "world-writable permission change",
            r"(?i)\bchmod\s+(?:-\S+\s+)*(?:0?777|a\+rwx)(?:\s|$)",
        ),
        BlockRule::new(
            "ownership_change",
            "recursive ownership change",
            r"(?i)\bch(?:own|grp)\s+(?:[^\s;&|]+\s+)*?(?:-[a-z]*r[a-z]*|--recursive)(?:\s|$)",
        ),
        BlockRule::new(
            "device_write",
            "write to raw device file",
            r"(?i)>\s*/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme\d|disk\d|mmcblk\d)",
        ),
    ];
}

/// All rules, in evaluation order
pub fn block_rules() -> &'static [BlockRule] {
    &BLOCK_RULES
}

/// First rule matching the command, if any
pub fn find_blocking_rule(command: &str) -> Option<&'static BlockRule> {
    let trimmed = command.trim();
    BLOCK_RULES.iter().find(|rule| rule.is_match(trimmed))
}

/// Whether the command matches any rule
pub fn is_blocked(command: &str) -> bool {
    find_blocking_rule(command).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_compile() {
        assert_eq!(block_rules().len(), 8);
    }

    #[test]
    fn test_blocked_commands() {
        assert!(is_blocked("rm -rf /"));
        assert!(is_blocked("rm -Rf ~/projects"));
        assert!(is_blocked("rm --recursive build"));
        assert!(is_blocked("rm file.txt -r"));
        assert!(is_blocked("sudo rm /etc/hosts"));
        assert!(is_blocked("mkfs.ext4 /dev/sdb1"));
        assert!(is_blocked("diskutil eraseDisk JHFS+ x disk2"));
        assert!(is_blocked("dd if=/dev/zero of=/dev/sda bs=1M"));
        assert!(is_blocked(":(){ :|:& };:"));
        assert!(is_blocked("chmod -R 777 /"));
        assert!(is_blocked("chown -R nobody /usr"));
        assert!(is_blocked("echo hi > /dev/sda"));
        assert!(is_blocked("ls && rm -rf build"));
    }

    #[test]
    fn test_casing_and_whitespace() {
        assert!(is_blocked("sudo   RM -rf /"));
        assert!(is_blocked("   RM   -RF   /tmp/x   "));
        assert!(is_blocked("\tMKFS /dev/sdc\n"));
    }

    #[test]
    fn test_allowed_commands() {
        assert!(!is_blocked("ls -la"));
        assert!(!is_blocked("git status"));
        assert!(!is_blocked("rm notes.txt"));
        assert!(!is_blocked("echo done > /dev/null"));
        assert!(!is_blocked("chmod 644 README.md"));
        assert!(!is_blocked("grep -r firmware ."));
        assert!(!is_blocked("cargo fmt"));
        assert!(!is_blocked("rm notes.txt && ls -R"));
        assert!(!is_blocked("rm notes.txt; grep -r todo ."));
        assert!(!is_blocked("chown me file.txt | ls -R"));
    }

    #[test]
    fn test_first_matching_rule_reported() {
        let rule = find_blocking_rule("sudo rm -rf /").unwrap();
        assert_eq!(rule.name, "recursive_delete");

        let rule = find_blocking_rule("sudo rm /var/log/syslog").unwrap();
        assert_eq!(rule.name, "sudo_remove");
        assert!(rule.pattern.contains("sudo"));
    }
}
