/// Rollup status shared by stacks and services.
///
/// The derivation rule is identical at both levels; only the zero-container
/// wording differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackStatus {
    /// A stack with zero containers.
    Empty,
    /// A service with zero containers.
    NoContainers,
    Stopped,
    Running,
    Partial,
}

impl StackStatus {
    pub fn for_stack(running: usize, total: usize) -> Self {
        Self::derive(running, total, StackStatus::Empty)
    }

    pub fn for_service(running: usize, total: usize) -> Self {
        Self::derive(running, total, StackStatus::NoContainers)
    }

    fn derive(running: usize, total: usize, when_empty: StackStatus) -> Self {
        if total == 0 {
            when_empty
        } else if running == 0 {
            StackStatus::Stopped
        } else if running == total {
            StackStatus::Running
        } else {
            StackStatus::Partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rule() {
        assert_eq!(StackStatus::for_stack(0, 0), StackStatus::Empty);
        assert_eq!(StackStatus::for_service(0, 0), StackStatus::NoContainers);
        assert_eq!(StackStatus::for_stack(0, 3), StackStatus::Stopped);
        assert_eq!(StackStatus::for_stack(3, 3), StackStatus::Running);
        assert_eq!(StackStatus::for_stack(2, 3), StackStatus::Partial);
        assert_eq!(StackStatus::for_service(1, 1), StackStatus::Running);
    }
}
