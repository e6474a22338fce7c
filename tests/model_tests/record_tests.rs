//! Record Tests
//!
//! Tests verify:
//! - Property get/set/add/delete semantics
//! - Dirty tracking on properties and records
//! - Merge precedence between local edits and a newer disk copy
//! - Pretty rendering

use pipedb::{PipeDbError, Property, Record};

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_record() -> Record {
    Record::new("bob", "active")
        .with_property("role", "admin")
        .with_property("quota", "10")
}

// =============================================================================
// Property Access Tests
// =============================================================================

#[test]
fn test_new_record_is_clean_singleton() {
    let record = Record::new("alice", "user");

    assert_eq!(record.key(), "alice");
    assert_eq!(record.record_type(), "user");
    assert!(record.is_singleton());
    assert!(!record.is_dirty());
}

#[test]
fn test_get_property() {
    let record = sample_record();

    let role = record.get_property("role").unwrap();
    assert_eq!(role.name(), "role");
    assert_eq!(role.value(), "admin");
    assert!(record.get_property("missing").is_none());
    assert_eq!(record.get_property_value("missing"), None);
}

#[test]
fn test_property_display() {
    assert_eq!(Property::new("role", "admin").to_string(), "role=admin");
}

// =============================================================================
// Set Property Tests
// =============================================================================

#[test]
fn test_set_existing_property_marks_dirty() {
    let mut record = sample_record();

    record.set_property("quota", "20", false).unwrap();

    assert_eq!(record.get_property_value("quota"), Some("20"));
    assert!(record.get_property("quota").unwrap().is_dirty());
    assert!(!record.get_property("role").unwrap().is_dirty());
    assert!(record.is_dirty());
}

#[test]
fn test_set_missing_property_without_create_fails() {
    let mut record = sample_record();

    let result = record.set_property("shell", "/bin/sh", false);

    assert!(matches!(result, Err(PipeDbError::NotFound(_))));
    assert!(!record.is_dirty());
}

#[test]
fn test_set_missing_property_with_create_appends() {
    let mut record = sample_record();

    record.set_property("shell", "/bin/sh", true).unwrap();

    let names: Vec<&str> = record.properties().map(|p| p.name()).collect();
    assert_eq!(names, vec!["role", "quota", "shell"]);
    assert!(record.get_property("shell").unwrap().is_dirty());
}

// =============================================================================
// Add Property Tests
// =============================================================================

#[test]
fn test_add_property_existing_without_clobber_fails() {
    let mut record = sample_record();

    let result = record.add_property(Property::new("role", "member"), false);

    assert!(matches!(result, Err(PipeDbError::AlreadyExists(_))));
    assert_eq!(record.get_property_value("role"), Some("admin"));
}

#[test]
fn test_add_property_with_clobber_replaces_in_place() {
    let mut record = sample_record();

    record.add_property(Property::new("role", "member"), true).unwrap();

    let names: Vec<&str> = record.properties().map(|p| p.name()).collect();
    assert_eq!(names, vec!["role", "quota"]);
    assert_eq!(record.get_property_value("role"), Some("member"));
    assert!(record.get_property("role").unwrap().is_dirty());
}

// =============================================================================
// Delete Property Tests
// =============================================================================

#[test]
fn test_delete_property_moves_to_pending() {
    let mut record = sample_record();

    record.delete_property("role").unwrap();

    assert!(record.get_property("role").is_none());
    assert_eq!(record.pending_deletions().len(), 1);
    assert_eq!(record.pending_deletions()[0].name(), "role");
    assert!(record.is_dirty());
}

#[test]
fn test_delete_missing_property_fails() {
    let mut record = sample_record();

    let result = record.delete_property("missing");

    assert!(matches!(result, Err(PipeDbError::NotFound(_))));
    assert!(!record.is_dirty());
}

#[test]
fn test_readd_cancels_pending_deletion() {
    let mut record = sample_record();

    record.delete_property("role").unwrap();
    record.set_property("role", "member", true).unwrap();

    assert!(record.pending_deletions().is_empty());
    assert_eq!(record.get_property_value("role"), Some("member"));
}

// =============================================================================
// Dirty Tracking Tests
// =============================================================================

#[test]
fn test_set_type_marks_record_dirty() {
    let mut record = Record::new("flag", "off");

    record.set_type("on").unwrap();

    assert_eq!(record.record_type(), "on");
    assert!(record.is_dirty());
}

#[test]
fn test_clean_clears_all_flags() {
    let mut record = sample_record();
    record.set_property("quota", "20", false).unwrap();
    record.delete_property("role").unwrap();
    record.set_type("disabled").unwrap();

    record.clean();

    assert!(!record.is_dirty());
    assert!(record.properties().all(|p| !p.is_dirty()));
    assert!(record.pending_deletions().is_empty());
}

// =============================================================================
// Field Validation Tests
// =============================================================================

#[test]
fn test_line_break_in_value_is_rejected() {
    let mut record = sample_record();

    let result = record.set_property("quota", "1\r", false);

    assert!(matches!(result, Err(PipeDbError::InvalidField(_))));
    assert_eq!(record.get_property_value("quota"), Some("10"));
    assert!(!record.is_dirty());
}

#[test]
fn test_unstorable_name_type_and_value_are_rejected() {
    let mut record = sample_record();

    let bad_name = record.add_property(Property::new("a\nb", "x"), false);
    let bad_value = record.set_property("path", "C:\\", true);
    let bad_type = record.set_type("on\n");

    assert!(matches!(bad_name, Err(PipeDbError::InvalidField(_))));
    assert!(matches!(bad_value, Err(PipeDbError::InvalidField(_))));
    assert!(matches!(bad_type, Err(PipeDbError::InvalidField(_))));
    assert_eq!(record.record_type(), "active");
    assert_eq!(record.property_count(), 2);
}

#[test]
fn test_backslashes_inside_a_value_are_accepted() {
    let mut record = sample_record();

    record.set_property("path", "C:\\new\\dir", true).unwrap();

    assert_eq!(record.get_property_value("path"), Some("C:\\new\\dir"));
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_dirty_local_wins() {
    let mut local = sample_record();
    local.set_property("quota", "20", false).unwrap();
    let disk = Record::new("bob", "active")
        .with_property("role", "admin")
        .with_property("quota", "30");

    local.merge(disk);

    assert_eq!(local.get_property_value("quota"), Some("20"));
}

#[test]
fn test_merge_clean_local_adopts_disk() {
    let mut local = sample_record();
    local.set_property("quota", "20", false).unwrap();
    let disk = Record::new("bob", "active")
        .with_property("role", "member")
        .with_property("quota", "10");

    local.merge(disk);

    assert_eq!(local.get_property_value("role"), Some("member"));
    assert_eq!(local.get_property_value("quota"), Some("20"));
}

#[test]
fn test_merge_adds_disk_only_properties() {
    let mut local = sample_record();
    local.set_property("quota", "20", false).unwrap();
    let disk = sample_record().with_property("shell", "/bin/zsh");

    local.merge(disk);

    let names: Vec<&str> = local.properties().map(|p| p.name()).collect();
    assert_eq!(names, vec!["role", "quota", "shell"]);
    assert_eq!(local.get_property_value("shell"), Some("/bin/zsh"));
}

#[test]
fn test_merge_keeps_dirty_local_only_property() {
    let mut local = sample_record();
    local.set_property("shell", "/bin/sh", true).unwrap();

    local.merge(sample_record());

    assert_eq!(local.get_property_value("shell"), Some("/bin/sh"));
}

#[test]
fn test_merge_keeps_clean_local_only_property() {
    let mut local = Record::new("bob", "active")
        .with_property("keep", "1")
        .with_property("q", "2");
    local.set_property("q", "2", false).unwrap();
    let disk = Record::new("bob", "active").with_property("q", "9");

    local.merge(disk);

    assert_eq!(local.get_property_value("keep"), Some("1"));
    assert_eq!(local.get_property_value("q"), Some("2"));
}

#[test]
fn test_merge_applies_pending_deletions() {
    let mut local = sample_record();
    local.delete_property("role").unwrap();
    let disk = sample_record().with_property("shell", "/bin/zsh");

    local.merge(disk);

    assert!(local.get_property("role").is_none());
    assert_eq!(local.get_property_value("quota"), Some("10"));
    assert_eq!(local.get_property_value("shell"), Some("/bin/zsh"));
    assert!(local.pending_deletions().is_empty());
}

#[test]
fn test_merge_type_follows_disk_unless_changed() {
    let mut untouched = sample_record();
    untouched.set_property("quota", "20", false).unwrap();
    untouched.merge(Record::new("bob", "locked"));
    assert_eq!(untouched.record_type(), "locked");

    let mut changed = sample_record();
    changed.set_type("disabled").unwrap();
    changed.merge(Record::new("bob", "locked"));
    assert_eq!(changed.record_type(), "disabled");
}

// =============================================================================
// Rendering Tests
// =============================================================================

#[test]
fn test_pretty_sorts_properties_by_name() {
    let record = sample_record();

    assert_eq!(record.pretty(), "bob=active\n    quota=10\n    role=admin");
}

#[test]
fn test_pretty_singleton() {
    assert_eq!(Record::new("alice", "user").pretty(), "alice=user");
}
