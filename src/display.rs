use crate::assignments::AssignmentRecord;
use crate::collector::CollectorProfile;
use crate::directory::{BarangayRecord, DirectorySelection, DisplayState};

/// Formats a barangay with its cluster tag
pub fn format_barangay(record: &BarangayRecord) -> String {
    match &record.cluster_id {
        Some(cluster) => format!("[{}] {}", cluster, record.barangay_name),
        None => record.barangay_name.clone(),
    }
}

/// Formats an assignment line: id, cluster and schedule
pub fn format_assignment(assignment: &AssignmentRecord) -> String {
    format!(
        "#{} cluster {} - {}",
        assignment.assignment_id,
        assignment.cluster_id,
        assignment.schedule_label()
    )
}

/// Prints the directory list the way the selection view shows it
pub fn print_directory(selection: &DirectorySelection, error: Option<&str>) {
    println!("\n=== Barangay Directory ===");
    if let Some(cluster) = selection.cluster_filter() {
        println!("Cluster: {}", cluster);
    }
    if !selection.text_filter().trim().is_empty() {
        println!("Search: \"{}\"", selection.text_filter().trim());
    }

    match selection.display_state(false, error) {
        DisplayState::Loading => println!("Loading barangays..."),
        DisplayState::Error(message) => println!("⚠️  {}", message),
        DisplayState::Empty => println!("No barangays found"),
        DisplayState::Items(items) => {
            for record in &items {
                let mark = if selection.is_selected(&record.barangay_id) { "x" } else { " " };
                println!("  [{}] {} (ID: {})", mark, format_barangay(record), record.barangay_id);
            }
            println!("{} of {} barangays shown", items.len(), selection.items().len());
        }
    }
}

pub fn print_assignments(assignments: &[AssignmentRecord]) {
    println!("\n=== Pending Assignments ===");
    if assignments.is_empty() {
        println!("No pending assignments");
        return;
    }
    for assignment in assignments {
        println!("  {}", format_assignment(assignment));
    }
}

pub fn print_profile(profile: &CollectorProfile) {
    println!("\n=== Collector Profile ===");
    for (key, value) in profile.fields() {
        match value {
            serde_json::Value::String(s) => println!("  {}: {}", key, s),
            other => println!("  {}: {}", key, other),
        }
    }
}
