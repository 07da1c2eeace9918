//! The access verdict.
//!
//! A pure function over the account flags and the subscription snapshot.
//! The rule order is a business decision and is load-bearing: pause wins
//! over everything including unlimited access, and a zero-credit account
//! still browses (credit exhaustion is enforced at generation time, not
//! at the door). Do not merge the subscription and credit rules.

use crate::cache::SubscriptionStatus;

/// What the route guard should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Let the account in.
    Allow,
    /// The account is administratively paused.
    DenyPaused,
    /// No entitlement: send to the billing page.
    RedirectToBilling,
}

/// The account fields the verdict depends on.
#[derive(Clone, Copy, Debug)]
pub struct AccountAccess {
    pub paused: bool,
    pub has_unlimited_access: bool,
    pub credits: i64,
}

/// Decide access for an account.
pub fn evaluate(account: &AccountAccess, subscription: &SubscriptionStatus) -> Verdict {
    if account.paused {
        return Verdict::DenyPaused;
    }
    if account.has_unlimited_access {
        return Verdict::Allow;
    }
    if subscription.is_subscribed() {
        return Verdict::Allow;
    }
    if account.credits > 0 {
        return Verdict::Allow;
    }
    Verdict::RedirectToBilling
}
