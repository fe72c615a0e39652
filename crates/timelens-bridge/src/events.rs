//! Event names exchanged with the panel

// Page -> panel
pub const INIT: &str = "vuex:init";
pub const MUTATION: &str = "vuex:mutation";
pub const INSPECTED_STATE: &str = "vuex:inspected-state";
pub const ERROR: &str = "vuex:error";

// Panel -> page
pub const TRAVEL_TO_STATE: &str = "vuex:travel-to-state";
pub const COMMIT_ALL: &str = "vuex:commit-all";
pub const REVERT_ALL: &str = "vuex:revert-all";
pub const COMMIT: &str = "vuex:commit";
pub const REVERT: &str = "vuex:revert";
pub const IMPORT_STATE: &str = "vuex:import-state";
pub const INSPECT_STATE: &str = "vuex:inspect-state";
pub const EDIT_STATE: &str = "vuex:edit-state";
pub const SET_RECORDING: &str = "vuex:set-recording";
