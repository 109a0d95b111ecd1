use swap_models::uint::U256;

/// The single action button under the swap form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAction {
    Approve { pending: bool },
    ReviewSwap,
    InsufficientBalance,
}

impl SwapAction {
    /// Balance is checked first and wins over any allowance state. An
    /// allowance that has not been read yet does not block the review.
    pub fn decide(
        required: Option<U256>,
        allowance: Option<U256>,
        balance: Option<U256>,
        approval_pending: bool,
    ) -> Self {
        if let (Some(required), Some(balance)) = (required, balance) {
            if required > balance {
                return SwapAction::InsufficientBalance;
            }
        }
        if approval_pending {
            return SwapAction::Approve { pending: true };
        }
        match (allowance, required) {
            (Some(allowance), _) if allowance.is_zero() => SwapAction::Approve { pending: false },
            (Some(allowance), Some(required)) if allowance < required => {
                SwapAction::Approve { pending: false }
            }
            _ => SwapAction::ReviewSwap,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SwapAction::Approve { pending: false } => "Approve",
            SwapAction::Approve { pending: true } => "Approving…",
            SwapAction::ReviewSwap => "Review Swap",
            SwapAction::InsufficientBalance => "Insufficient Balance",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, SwapAction::InsufficientBalance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(value: u64) -> Option<U256> {
        Some(U256::from(value))
    }

    #[test]
    fn test_allowance_below_required_needs_approval() {
        let action = SwapAction::decide(amount(10), amount(9), amount(100), false);
        assert_eq!(action, SwapAction::Approve { pending: false });
        assert_eq!(action.label(), "Approve");
        assert!(action.is_enabled());
    }

    #[test]
    fn test_zero_allowance_needs_approval_without_amount() {
        assert_eq!(
            SwapAction::decide(None, amount(0), None, false),
            SwapAction::Approve { pending: false }
        );
    }

    #[test]
    fn test_sufficient_allowance_reviews() {
        for allowance in [10, 11, u64::MAX] {
            let action = SwapAction::decide(amount(10), amount(allowance), amount(10), false);
            assert_eq!(action, SwapAction::ReviewSwap);
            assert_eq!(action.label(), "Review Swap");
        }
    }

    #[test]
    fn test_unknown_allowance_reviews() {
        assert_eq!(
            SwapAction::decide(amount(10), None, None, false),
            SwapAction::ReviewSwap
        );
    }

    #[test]
    fn test_insufficient_balance_wins() {
        for allowance in [None, amount(0), amount(5), amount(1_000)] {
            let action = SwapAction::decide(amount(11), allowance, amount(10), false);
            assert_eq!(action, SwapAction::InsufficientBalance);
            assert_eq!(action.label(), "Insufficient Balance");
            assert!(!action.is_enabled());
        }
        assert_eq!(
            SwapAction::decide(amount(11), amount(0), amount(10), true),
            SwapAction::InsufficientBalance
        );
    }

    #[test]
    fn test_pending_approval_label() {
        let action = SwapAction::decide(amount(10), amount(0), amount(10), true);
        assert_eq!(action.label(), "Approving…");
        assert!(action.is_enabled());
    }
}
