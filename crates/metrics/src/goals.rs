//! Goals — target values tracked against computed metrics, optionally
//! scoped to one funnel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalDirection {
    /// The metric should reach or exceed the target (revenue, ROAS).
    AtLeast,
    /// The metric should stay at or below the target (CPA, spend).
    AtMost,
}

/// A target for a metric. `metric_key` names either an aggregate total
/// (`totalRevenue`, `avgCpa`, ...) or a custom metric; `custom_metric_id`
/// pins the latter explicitly. A goal without `funnel_id` is
/// workspace-global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub metric_key: String,
    pub custom_metric_id: Option<Uuid>,
    pub funnel_id: Option<Uuid>,
    pub target: f64,
    pub direction: GoalDirection,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        workspace_id: Uuid,
        name: impl Into<String>,
        metric_key: impl Into<String>,
        target: f64,
        direction: GoalDirection,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.into(),
            metric_key: metric_key.into(),
            custom_metric_id: None,
            funnel_id: None,
            target,
            direction,
            created_at: Utc::now(),
        }
    }

    pub fn for_funnel(mut self, funnel_id: Uuid) -> Self {
        self.funnel_id = Some(funnel_id);
        self
    }

    pub fn for_custom_metric(mut self, metric_id: Uuid) -> Self {
        self.custom_metric_id = Some(metric_id);
        self
    }
}

/// Progress of one goal at render time. `current` is `None` when the
/// underlying metric could not be computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalStatus {
    pub goal_id: Uuid,
    pub name: String,
    pub metric_key: String,
    pub funnel_id: Option<Uuid>,
    pub current: Option<f64>,
    pub target: f64,
    pub direction: GoalDirection,
    pub achieved: bool,
    /// Fraction of the way to the target, clamped to `[0, 1]`.
    pub progress: f64,
}

/// In-memory goal registry.
pub struct GoalTracker {
    goals: dashmap::DashMap<Uuid, Goal>,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self {
            goals: dashmap::DashMap::new(),
        }
    }

    pub fn register(&self, goal: Goal) {
        info!(goal = %goal.name, workspace = %goal.workspace_id, "goal registered");
        self.goals.insert(goal.id, goal);
    }

    pub fn get(&self, id: &Uuid) -> Option<Goal> {
        self.goals.get(id).map(|g| g.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Goal> {
        self.goals.remove(id).map(|(_, g)| g)
    }

    /// Goals that apply when rendering one funnel: workspace-global goals
    /// plus goals scoped to that funnel. When a global and a per-funnel
    /// goal track the same metric key, both are returned — display
    /// precedence is the caller's decision.
    pub fn goals_for(&self, workspace_id: &Uuid, funnel_id: &Uuid) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self
            .goals
            .iter()
            .filter(|g| {
                let goal = g.value();
                goal.workspace_id == *workspace_id
                    && goal.funnel_id.map_or(true, |id| id == *funnel_id)
            })
            .map(|g| g.value().clone())
            .collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        goals
    }

    /// Compute the status of a goal given the metric's current value.
    pub fn status(goal: &Goal, current: Option<f64>) -> GoalStatus {
        let (achieved, progress) = match current {
            None => (false, 0.0),
            Some(value) => match goal.direction {
                GoalDirection::AtLeast => {
                    let achieved = value >= goal.target;
                    let progress = if goal.target > 0.0 {
                        (value / goal.target).clamp(0.0, 1.0)
                    } else if achieved {
                        1.0
                    } else {
                        0.0
                    };
                    (achieved, progress)
                }
                GoalDirection::AtMost => {
                    let achieved = value <= goal.target;
                    let progress = if achieved {
                        1.0
                    } else if value > 0.0 {
                        (goal.target / value).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    (achieved, progress)
                }
            },
        };
        GoalStatus {
            goal_id: goal.id,
            name: goal.name.clone(),
            metric_key: goal.metric_key.clone(),
            funnel_id: goal.funnel_id,
            current,
            target: goal.target,
            direction: goal.direction,
            achieved,
            progress,
        }
    }
}

impl Default for GoalTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_goal_progress() {
        let goal = Goal::new(
            Uuid::new_v4(),
            "Monthly revenue",
            "totalRevenue",
            10_000.0,
            GoalDirection::AtLeast,
        );
        let halfway = GoalTracker::status(&goal, Some(5_000.0));
        assert!(!halfway.achieved);
        assert_eq!(halfway.progress, 0.5);

        let done = GoalTracker::status(&goal, Some(12_000.0));
        assert!(done.achieved);
        assert_eq!(done.progress, 1.0);
    }

    #[test]
    fn at_most_goal_progress() {
        let goal = Goal::new(
            Uuid::new_v4(),
            "CPA cap",
            "avgCpa",
            20.0,
            GoalDirection::AtMost,
        );
        let over = GoalTracker::status(&goal, Some(40.0));
        assert!(!over.achieved);
        assert_eq!(over.progress, 0.5);

        let under = GoalTracker::status(&goal, Some(15.0));
        assert!(under.achieved);
        assert_eq!(under.progress, 1.0);
    }

    #[test]
    fn missing_metric_value_is_not_achieved() {
        let goal = Goal::new(
            Uuid::new_v4(),
            "Broken metric",
            "customThing",
            1.0,
            GoalDirection::AtLeast,
        );
        let status = GoalTracker::status(&goal, None);
        assert!(!status.achieved);
        assert_eq!(status.progress, 0.0);
        assert!(status.current.is_none());
    }

    #[test]
    fn global_and_funnel_goals_are_both_surfaced() {
        let tracker = GoalTracker::new();
        let workspace = Uuid::new_v4();
        let funnel = Uuid::new_v4();
        let other_funnel = Uuid::new_v4();

        tracker.register(Goal::new(
            workspace,
            "Global ROAS",
            "avgRoas",
            3.0,
            GoalDirection::AtLeast,
        ));
        tracker.register(
            Goal::new(workspace, "Funnel ROAS", "avgRoas", 5.0, GoalDirection::AtLeast)
                .for_funnel(funnel),
        );
        tracker.register(
            Goal::new(workspace, "Elsewhere", "avgRoas", 2.0, GoalDirection::AtLeast)
                .for_funnel(other_funnel),
        );

        let applicable = tracker.goals_for(&workspace, &funnel);
        let names: Vec<&str> = applicable.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Global ROAS"));
        assert!(names.contains(&"Funnel ROAS"));
        assert!(!names.contains(&"Elsewhere"));
    }
}
