use std::sync::Arc;

use super::record::BarangayRecord;
use crate::id::Id;

/// Restricts `items` to `cluster` (when set), then to names containing the
/// trimmed `text`, ignoring case. Input order is kept.
pub fn filter_barangays<'a>(
    items: &'a [BarangayRecord],
    cluster: Option<&Id>,
    text: &str,
) -> Vec<&'a BarangayRecord> {
    let needle = text.trim().to_lowercase();
    items
        .iter()
        .filter(|record| cluster.map_or(true, |c| record.cluster_id.as_ref() == Some(c)))
        .filter(|record| needle.is_empty() || record.barangay_name.to_lowercase().contains(&needle))
        .collect()
}

/// What a toggle did, carrying the full record for the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange {
    Added(BarangayRecord),
    Removed(BarangayRecord),
}

impl SelectionChange {
    pub fn record(&self) -> &BarangayRecord {
        match self {
            SelectionChange::Added(record) | SelectionChange::Removed(record) => record,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SelectionChange::Added(_) => "added",
            SelectionChange::Removed(_) => "removed",
        }
    }
}

/// Mutually exclusive states of the directory list.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState<'a> {
    Loading,
    Error(String),
    Empty,
    Items(Vec<&'a BarangayRecord>),
}

/// Directory list with its filters and the user's current selection.
#[derive(Debug, Clone)]
pub struct DirectorySelection {
    items: Arc<[BarangayRecord]>,
    cluster_filter: Option<Id>,
    text_filter: String,
    selected: Vec<BarangayRecord>,
}

impl DirectorySelection {
    pub fn new(items: impl Into<Arc<[BarangayRecord]>>) -> Self {
        Self {
            items: items.into(),
            cluster_filter: None,
            text_filter: String::new(),
            selected: Vec::new(),
        }
    }

    pub fn items(&self) -> &[BarangayRecord] {
        &self.items
    }

    pub fn cluster_filter(&self) -> Option<&Id> {
        self.cluster_filter.as_ref()
    }

    pub fn text_filter(&self) -> &str {
        &self.text_filter
    }

    pub fn set_cluster_filter(&mut self, cluster: Option<Id>) {
        self.cluster_filter = cluster.filter(|c| !c.is_empty());
    }

    pub fn set_text_filter(&mut self, text: impl Into<String>) {
        self.text_filter = text.into();
    }

    pub fn visible_items(&self) -> Vec<&BarangayRecord> {
        filter_barangays(&self.items, self.cluster_filter.as_ref(), &self.text_filter)
    }

    pub fn toggle(&mut self, record: &BarangayRecord) -> SelectionChange {
        match self
            .selected
            .iter()
            .position(|s| s.barangay_id == record.barangay_id)
        {
            Some(index) => SelectionChange::Removed(self.selected.remove(index)),
            None => {
                self.selected.push(record.clone());
                SelectionChange::Added(record.clone())
            }
        }
    }

    /// Toggles the directory entry with this id. `None` if the id is not in
    /// the directory.
    pub fn toggle_id(&mut self, id: &Id) -> Option<SelectionChange> {
        let items = Arc::clone(&self.items);
        let record = items.iter().find(|r| &r.barangay_id == id)?;
        Some(self.toggle(record))
    }

    pub fn is_selected(&self, id: &Id) -> bool {
        self.selected.iter().any(|s| &s.barangay_id == id)
    }

    pub fn selected(&self) -> &[BarangayRecord] {
        &self.selected
    }

    pub fn selected_ids(&self) -> Vec<Id> {
        self.selected.iter().map(|r| r.barangay_id.clone()).collect()
    }

    /// Re-selects `ids` in order, skipping ids no longer in the directory.
    pub fn restore_selection(&mut self, ids: &[Id]) {
        self.selected.clear();
        for id in ids {
            if self.is_selected(id) {
                continue;
            }
            if let Some(record) = self.items.iter().find(|r| &r.barangay_id == id) {
                self.selected.push(record.clone());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Loading wins over an error, an error wins over an empty result. A
    /// blank error string counts as no error.
    pub fn display_state(&self, loading: bool, error: Option<&str>) -> DisplayState<'_> {
        if loading {
            return DisplayState::Loading;
        }
        if let Some(message) = error.filter(|m| !m.trim().is_empty()) {
            return DisplayState::Error(message.to_string());
        }

        let visible = self.visible_items();
        if visible.is_empty() {
            DisplayState::Empty
        } else {
            DisplayState::Items(visible)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Vec<BarangayRecord> {
        vec![
            BarangayRecord::new("1", "Abella").in_cluster("1A"),
            BarangayRecord::new("2", "Bagumbayan Norte").in_cluster("1A"),
            BarangayRecord::new("3", "Bagumbayan Sur").in_cluster("2B"),
            BarangayRecord::new("4", "Balatas"),
            BarangayRecord::new("5", "Calauag").in_cluster("2B"),
        ]
    }

    fn ids(records: &[&BarangayRecord]) -> Vec<String> {
        records.iter().map(|r| r.barangay_id.to_string()).collect()
    }

    #[test]
    fn cluster_filter_keeps_order() {
        let items = sample();
        let visible = filter_barangays(&items, Some(&Id::from("2B")), "");
        assert_eq!(ids(&visible), vec!["3", "5"]);
    }

    #[test]
    fn text_filter_is_trimmed_and_case_insensitive() {
        let items = sample();
        let visible = filter_barangays(&items, None, "  bagumBAYAN ");
        assert_eq!(ids(&visible), vec!["2", "3"]);
    }

    #[test]
    fn both_filters_apply() {
        let mut selection = DirectorySelection::new(sample());
        selection.set_cluster_filter(Some(Id::from("1A")));
        selection.set_text_filter("sur");
        assert!(selection.visible_items().is_empty());

        selection.set_text_filter("norte");
        assert_eq!(ids(&selection.visible_items()), vec!["2"]);
    }

    #[test]
    fn blank_cluster_filter_means_all() {
        let mut selection = DirectorySelection::new(sample());
        selection.set_cluster_filter(Some(Id::from("  ")));
        assert_eq!(selection.cluster_filter(), None);
        assert_eq!(selection.visible_items().len(), 5);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let items = sample();
        let mut selection = DirectorySelection::new(items.clone());

        assert_eq!(selection.toggle(&items[2]), SelectionChange::Added(items[2].clone()));
        assert_eq!(selection.toggle(&items[0]), SelectionChange::Added(items[0].clone()));
        assert_eq!(selection.selected_ids(), vec![Id::from("3"), Id::from("1")]);

        let change = selection.toggle(&items[2]);
        assert_eq!(change, SelectionChange::Removed(items[2].clone()));
        assert_eq!(change.record().barangay_name, "Bagumbayan Sur");
        assert_eq!(selection.selected_ids(), vec![Id::from("1")]);
    }

    #[test]
    fn toggle_matches_on_id_only() {
        let mut selection = DirectorySelection::new(sample());
        selection.toggle(&BarangayRecord::new("1", "Abella"));
        let renamed = BarangayRecord::new("1", "Abella (renamed)");

        assert!(matches!(selection.toggle(&renamed), SelectionChange::Removed(_)));
        assert!(selection.selected().is_empty());
    }

    #[test]
    fn toggle_unknown_id_is_rejected() {
        let mut selection = DirectorySelection::new(sample());
        assert_eq!(selection.toggle_id(&Id::from("99")), None);
        assert!(selection.toggle_id(&Id::from("4")).is_some());
        assert!(selection.is_selected(&Id::from("4")));
    }

    #[test]
    fn restore_skips_unknown_and_repeated_ids() {
        let mut selection = DirectorySelection::new(sample());
        selection.restore_selection(&[Id::from("5"), Id::from("99"), Id::from("5"), Id::from("2")]);
        assert_eq!(selection.selected_ids(), vec![Id::from("5"), Id::from("2")]);

        selection.clear_selection();
        assert!(selection.selected().is_empty());
    }

    #[test]
    fn display_state_precedence() {
        let mut selection = DirectorySelection::new(sample());
        assert_eq!(selection.display_state(true, Some("boom")), DisplayState::Loading);
        assert_eq!(
            selection.display_state(false, Some("boom")),
            DisplayState::Error("boom".to_string())
        );

        selection.set_text_filter("nowhere");
        assert_eq!(selection.display_state(false, Some("boom")), DisplayState::Error("boom".to_string()));
        assert_eq!(selection.display_state(false, Some("  ")), DisplayState::Empty);
        assert_eq!(selection.display_state(false, None), DisplayState::Empty);

        selection.set_text_filter("");
        assert!(matches!(selection.display_state(false, None), DisplayState::Items(v) if v.len() == 5));
    }

    fn arb_records() -> impl Strategy<Value = Vec<BarangayRecord>> {
        prop::collection::vec(
            ("[A-Za-z ]{0,12}", prop::option::of(0u8..4)),
            0..30,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (name, cluster))| {
                    let mut record = BarangayRecord::new(i.to_string(), name);
                    record.cluster_id = cluster.map(|c| Id::from(c as u64));
                    record
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn cluster_then_empty_text_is_cluster_subset(records in arb_records(), cluster in 0u8..4) {
            let cluster = Id::from(cluster as u64);
            let visible = filter_barangays(&records, Some(&cluster), "");
            let expected: Vec<&BarangayRecord> = records
                .iter()
                .filter(|r| r.cluster_id.as_ref() == Some(&cluster))
                .collect();
            prop_assert_eq!(visible, expected);
        }

        #[test]
        fn text_filter_is_idempotent(records in arb_records(), text in "[ ]{0,2}[A-Za-z]{0,3}[ ]{0,2}") {
            let once: Vec<BarangayRecord> = filter_barangays(&records, None, &text)
                .into_iter()
                .cloned()
                .collect();
            let twice: Vec<BarangayRecord> = filter_barangays(&once, None, &text)
                .into_iter()
                .cloned()
                .collect();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn double_toggle_restores_membership(records in arb_records(), pick in any::<prop::sample::Index>()) {
            prop_assume!(!records.is_empty());
            let mut selection = DirectorySelection::new(records.clone());
            selection.toggle(&records[0]);
            let before = selection.selected_ids();

            let record = &records[pick.index(records.len())];
            selection.toggle(record);
            selection.toggle(record);

            let mut after = selection.selected_ids();
            let mut before_sorted = before.clone();
            after.sort();
            before_sorted.sort();
            prop_assert_eq!(after, before_sorted);
        }
    }
}
