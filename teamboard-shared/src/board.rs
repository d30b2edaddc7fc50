/// Kanban board grouping and drag-and-drop planning
///
/// A board is a project's tasks split into one column per [`TaskStatus`].
/// Dropping a card produces a [`DropPlan`]: either nothing to do, or the
/// full new order of every column the move touched. Planning is pure; the
/// plan is written with [`Task::apply_column_orders`].
///
/// # Drop rules
///
/// - On a column with another status: the card goes to the end of it
/// - On its own column: no change
/// - On another card in the same column: the card is removed and reinserted
///   at that card's index
/// - On a card in another column: the card is inserted at that card's index
/// - On itself or on a card that isn't on the board: no change
///
/// # Example
///
/// ```
/// use teamboard_shared::board::{plan_drop, BoardCard, DropPlan, DropTarget};
/// use teamboard_shared::models::task::TaskStatus;
/// use uuid::Uuid;
///
/// let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
/// let cards = [
///     BoardCard { id: a, status: TaskStatus::Todo },
///     BoardCard { id: b, status: TaskStatus::Todo },
/// ];
///
/// let target: DropTarget = "column-done".parse().unwrap();
/// let plan = plan_drop(&cards, a, target).unwrap();
/// assert!(matches!(plan, DropPlan::Move { status: TaskStatus::Done, .. }));
/// ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::task::{Task, TaskStatus};

/// Prefix of column drop-target IDs ("column-todo")
pub const COLUMN_PREFIX: &str = "column-";

/// Board planning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Invalid drop target: {0}")]
    InvalidTarget(String),

    #[error("Task {0} is not on this board")]
    UnknownTask(Uuid),
}

/// What a card was dropped on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Column(TaskStatus),
    Task(Uuid),
}

impl FromStr for DropTarget {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(status) = s.strip_prefix(COLUMN_PREFIX) {
            return status
                .parse()
                .map(DropTarget::Column)
                .map_err(|_| BoardError::InvalidTarget(s.to_string()));
        }

        Uuid::parse_str(s)
            .map(DropTarget::Task)
            .map_err(|_| BoardError::InvalidTarget(s.to_string()))
    }
}

/// Minimal view of a task for planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardCard {
    pub id: Uuid,
    pub status: TaskStatus,
}

/// Final order of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrder {
    pub status: TaskStatus,
    pub task_ids: Vec<Uuid>,
}

/// Outcome of a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPlan {
    Unchanged,

    /// The moved card ends up in `status`; `columns` holds the new order of
    /// every affected column (one for a reorder, two for a column change)
    Move {
        task_id: Uuid,
        status: TaskStatus,
        columns: Vec<ColumnOrder>,
    },
}

/// Tasks of one project, split into status columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl Board {
    /// Groups tasks into columns, each ordered by position
    ///
    /// Ties keep their incoming order.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Board::default();
        for task in tasks {
            board.column_mut(task.status).push(task);
        }
        for status in TaskStatus::ALL {
            board.column_mut(status).sort_by_key(|task| task.position);
        }
        board
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::InProgress => &mut self.in_progress,
            TaskStatus::Done => &mut self.done,
        }
    }

    /// Cards in board order, ready for [`plan_drop`]
    pub fn cards(&self) -> Vec<BoardCard> {
        TaskStatus::ALL
            .iter()
            .flat_map(|status| self.column(*status))
            .map(|task| BoardCard {
                id: task.id,
                status: task.status,
            })
            .collect()
    }
}

fn column_ids(cards: &[BoardCard], status: TaskStatus) -> Vec<Uuid> {
    cards
        .iter()
        .filter(|card| card.status == status)
        .map(|card| card.id)
        .collect()
}

/// Plans the result of dropping `active_id` on `target`
///
/// `cards` must be in board order: within a status, by position.
///
/// # Errors
///
/// [`BoardError::UnknownTask`] if the dragged card isn't on the board.
pub fn plan_drop(cards: &[BoardCard], active_id: Uuid, target: DropTarget) -> Result<DropPlan, BoardError> {
    let active = cards
        .iter()
        .find(|card| card.id == active_id)
        .ok_or(BoardError::UnknownTask(active_id))?;

    let (dest_status, dest_index) = match target {
        DropTarget::Column(status) => {
            if status == active.status {
                return Ok(DropPlan::Unchanged);
            }
            (status, None)
        }
        DropTarget::Task(over_id) => {
            if over_id == active_id {
                return Ok(DropPlan::Unchanged);
            }
            let Some(over) = cards.iter().find(|card| card.id == over_id) else {
                return Ok(DropPlan::Unchanged);
            };
            let index = column_ids(cards, over.status)
                .iter()
                .position(|id| *id == over_id);
            (over.status, index)
        }
    };

    let mut source = column_ids(cards, active.status);
    let old_index = source
        .iter()
        .position(|id| *id == active_id)
        .ok_or(BoardError::UnknownTask(active_id))?;

    if dest_status == active.status {
        // Same-column reorder: array move semantics.
        let new_index = dest_index.unwrap_or(source.len() - 1);
        source.remove(old_index);
        source.insert(new_index.min(source.len()), active_id);

        return Ok(DropPlan::Move {
            task_id: active_id,
            status: dest_status,
            columns: vec![ColumnOrder {
                status: dest_status,
                task_ids: source,
            }],
        });
    }

    source.remove(old_index);

    let mut dest = column_ids(cards, dest_status);
    match dest_index {
        Some(index) => dest.insert(index.min(dest.len()), active_id),
        None => dest.push(active_id),
    }

    Ok(DropPlan::Move {
        task_id: active_id,
        status: dest_status,
        columns: vec![
            ColumnOrder {
                status: active.status,
                task_ids: source,
            },
            ColumnOrder {
                status: dest_status,
                task_ids: dest,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn card(id: Uuid, status: TaskStatus) -> BoardCard {
        BoardCard { id, status }
    }

    fn columns(plan: DropPlan) -> Vec<ColumnOrder> {
        match plan {
            DropPlan::Move { columns, .. } => columns,
            DropPlan::Unchanged => panic!("expected a move"),
        }
    }

    #[test]
    fn test_parse_column_target() {
        assert_eq!(
            "column-in_progress".parse::<DropTarget>(),
            Ok(DropTarget::Column(TaskStatus::InProgress))
        );
        assert!("column-blocked".parse::<DropTarget>().is_err());
    }

    #[test]
    fn test_parse_task_target() {
        let id = Uuid::new_v4();
        assert_eq!(id.to_string().parse::<DropTarget>(), Ok(DropTarget::Task(id)));
        assert_eq!(
            "not-a-task".parse::<DropTarget>(),
            Err(BoardError::InvalidTarget("not-a-task".to_string()))
        );
    }

    #[test]
    fn test_drop_on_other_column_appends() {
        let id = ids(3);
        let cards = [
            card(id[0], TaskStatus::Todo),
            card(id[1], TaskStatus::Todo),
            card(id[2], TaskStatus::Done),
        ];

        let plan = plan_drop(&cards, id[0], DropTarget::Column(TaskStatus::Done)).unwrap();
        assert_eq!(
            columns(plan),
            vec![
                ColumnOrder { status: TaskStatus::Todo, task_ids: vec![id[1]] },
                ColumnOrder { status: TaskStatus::Done, task_ids: vec![id[2], id[0]] },
            ]
        );
    }

    #[test]
    fn test_drop_on_empty_column() {
        let id = ids(1);
        let cards = [card(id[0], TaskStatus::Todo)];

        let plan = plan_drop(&cards, id[0], DropTarget::Column(TaskStatus::InProgress)).unwrap();
        match plan {
            DropPlan::Move { task_id, status, columns } => {
                assert_eq!(task_id, id[0]);
                assert_eq!(status, TaskStatus::InProgress);
                assert!(columns[0].task_ids.is_empty());
                assert_eq!(columns[1].task_ids, vec![id[0]]);
            }
            DropPlan::Unchanged => panic!("expected a move"),
        }
    }

    #[test]
    fn test_drop_on_own_column_is_noop() {
        let id = ids(2);
        let cards = [card(id[0], TaskStatus::Todo), card(id[1], TaskStatus::Todo)];

        assert_eq!(
            plan_drop(&cards, id[0], DropTarget::Column(TaskStatus::Todo)),
            Ok(DropPlan::Unchanged)
        );
    }

    #[test]
    fn test_reorder_down_within_column() {
        let id = ids(3);
        let cards = [
            card(id[0], TaskStatus::Todo),
            card(id[1], TaskStatus::Todo),
            card(id[2], TaskStatus::Todo),
        ];

        let plan = plan_drop(&cards, id[0], DropTarget::Task(id[2])).unwrap();
        assert_eq!(
            columns(plan),
            vec![ColumnOrder { status: TaskStatus::Todo, task_ids: vec![id[1], id[2], id[0]] }]
        );
    }

    #[test]
    fn test_reorder_up_within_column() {
        let id = ids(3);
        let cards = [
            card(id[0], TaskStatus::Todo),
            card(id[1], TaskStatus::Todo),
            card(id[2], TaskStatus::Todo),
        ];

        let plan = plan_drop(&cards, id[2], DropTarget::Task(id[0])).unwrap();
        assert_eq!(
            columns(plan),
            vec![ColumnOrder { status: TaskStatus::Todo, task_ids: vec![id[2], id[0], id[1]] }]
        );
    }

    #[test]
    fn test_drop_on_card_in_other_column_inserts_before_it() {
        let id = ids(4);
        let cards = [
            card(id[0], TaskStatus::Todo),
            card(id[1], TaskStatus::InProgress),
            card(id[2], TaskStatus::InProgress),
            card(id[3], TaskStatus::Done),
        ];

        let plan = plan_drop(&cards, id[0], DropTarget::Task(id[2])).unwrap();
        assert_eq!(
            columns(plan),
            vec![
                ColumnOrder { status: TaskStatus::Todo, task_ids: vec![] },
                ColumnOrder {
                    status: TaskStatus::InProgress,
                    task_ids: vec![id[1], id[0], id[2]],
                },
            ]
        );
    }

    #[test]
    fn test_drop_on_self_or_unknown_is_noop() {
        let id = ids(2);
        let cards = [card(id[0], TaskStatus::Todo), card(id[1], TaskStatus::Todo)];

        assert_eq!(plan_drop(&cards, id[0], DropTarget::Task(id[0])), Ok(DropPlan::Unchanged));
        assert_eq!(
            plan_drop(&cards, id[0], DropTarget::Task(Uuid::new_v4())),
            Ok(DropPlan::Unchanged)
        );
    }

    #[test]
    fn test_unknown_active_card() {
        let id = ids(1);
        let cards = [card(id[0], TaskStatus::Todo)];
        let missing = Uuid::new_v4();

        assert_eq!(
            plan_drop(&cards, missing, DropTarget::Column(TaskStatus::Done)),
            Err(BoardError::UnknownTask(missing))
        );
    }

    #[test]
    fn test_board_groups_and_orders_by_position() {
        let project_id = Uuid::new_v4();
        let task = |status: TaskStatus, position: i32| Task {
            id: Uuid::new_v4(),
            project_id,
            title: format!("{status} {position}"),
            description: None,
            status,
            assigned_to: None,
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let board = Board::from_tasks(vec![
            task(TaskStatus::Done, 0),
            task(TaskStatus::Todo, 1),
            task(TaskStatus::Todo, 0),
        ]);

        assert_eq!(board.todo.len(), 2);
        assert_eq!(board.todo[0].position, 0);
        assert_eq!(board.todo[1].position, 1);
        assert!(board.in_progress.is_empty());
        assert_eq!(board.done.len(), 1);

        let cards = board.cards();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].id, board.todo[0].id);
        assert_eq!(cards[2].status, TaskStatus::Done);
    }
}
