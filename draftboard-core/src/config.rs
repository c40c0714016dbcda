//! Settings for the outline controller. Built once at startup (usually from the user's preferences file) and
//! handed to every [`crate::outline::OutlineController`] that needs it.

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// How many steps of undo are kept. Zero disables history entirely.
    pub history_depth: usize,
    /// Select freshly created nodes, like most outliners do.
    pub select_created: bool,
}
impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            history_depth: 256,
            select_created: true,
        }
    }
}
