use crate::model::category::Category;
use crate::model::item::item_key;
use crate::model::state::SyncState;
use crate::parse::{split_backlink, unchecked_item};

/// Error type for ordering operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("line {0} is past the end of the document")]
    NoSuchLine(usize),
    #[error("line {0} is not an open task with a [[source]] link")]
    NotATask(usize),
    #[error("no drag in progress")]
    NotDragging,
}

/// Where a dragged item lands relative to its drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

/// Item key of the open task on a 1-based line of the aggregate.
pub fn task_key_at_line(aggregate: &str, line_no: usize) -> Result<String, OrderError> {
    let line = line_no
        .checked_sub(1)
        .and_then(|idx| aggregate.lines().nth(idx))
        .ok_or(OrderError::NoSuchLine(line_no))?;
    let m = unchecked_item(line).ok_or(OrderError::NotATask(line_no))?;
    match split_backlink(m.text) {
        (task, Some(source)) => Ok(item_key(task, source)),
        _ => Err(OrderError::NotATask(line_no)),
    }
}

/// File `key` under `category`. Its position in any other category's
/// manual order is forgotten. Returns true if state changed.
pub fn move_to_category(state: &mut SyncState, key: &str, category: Category) -> bool {
    let mut changed = state.assign(key, category);
    for (other, order) in state.orders.iter_mut() {
        if *other != category {
            let before = order.len();
            order.retain(|k| k != key);
            changed |= order.len() != before;
        }
    }
    changed
}

/// Drop `dragged` next to `target`, adopting the target's category.
///
/// `section_keys` is the target section as currently rendered; keys there
/// without a manual position are appended to the order first so the drop
/// lands where the user saw it.
pub fn reorder(
    state: &mut SyncState,
    dragged: &str,
    target: &str,
    position: DropPosition,
    section_keys: &[String],
) -> bool {
    if dragged == target {
        return false;
    }
    let category = state.category_of(target);
    let before = state.clone();
    move_to_category(state, dragged, category);

    let order = state.orders.entry(category).or_default();
    for key in section_keys {
        if !order.contains(key) {
            order.push(key.clone());
        }
    }
    order.retain(|k| k != dragged);
    let idx = match order.iter().position(|k| k == target) {
        Some(i) if position == DropPosition::After => i + 1,
        Some(i) => i,
        None => order.len(),
    };
    order.insert(idx, dragged.to_string());

    *state != before
}

/// One drag-and-drop interaction in an editor.
///
/// Each editor owns its own session, so concurrent editors cannot clobber
/// each other's dragged line.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    dragged: Option<String>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up the task on `line_no` of the aggregate.
    pub fn begin(&mut self, aggregate: &str, line_no: usize) -> Result<(), OrderError> {
        self.dragged = Some(task_key_at_line(aggregate, line_no)?);
        Ok(())
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    /// Drop onto the task at `line_no`. Ends the session either way.
    pub fn drop_on(
        &mut self,
        state: &mut SyncState,
        aggregate: &str,
        line_no: usize,
        position: DropPosition,
        section_keys: &[String],
    ) -> Result<bool, OrderError> {
        let dragged = self.dragged.take().ok_or(OrderError::NotDragging)?;
        let target = task_key_at_line(aggregate, line_no)?;
        Ok(reorder(state, &dragged, &target, position, section_keys))
    }

    pub fn cancel(&mut self) {
        self.dragged = None;
    }
}
