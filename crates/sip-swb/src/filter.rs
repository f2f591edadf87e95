//! Message filters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Decides which messages pass a bus or channel boundary.
///
/// Filters see the message id and the payload bytes, so content-aware
/// filters are possible; the provided filters only look at the id.
pub trait MessageFilter<I> {
    /// Whether a message with `id` and `payload` is accepted.
    fn matches(&self, id: &I, payload: &[u8]) -> bool;
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterNone;

impl<I> MessageFilter<I> for FilterNone {
    fn matches(&self, _id: &I, _payload: &[u8]) -> bool {
        true
    }
}

/// One masked-id subscription entry.
///
/// Matches when `(id & mask) == (subscription_id & mask)`. A mask of all
/// ones (the default) means exact matching; zero bits in the mask ignore
/// the corresponding id bits. Each subscription counts its matches.
#[derive(Debug)]
pub struct BusSubscription<I> {
    id: I,
    mask: I,
    matched: AtomicU32,
}

impl<I> BusSubscription<I>
where
    I: Copy + PartialEq + std::ops::BitAnd<Output = I> + std::ops::Not<Output = I> + Default,
{
    /// Exact-match subscription for `id`.
    pub fn new(id: I) -> Self {
        Self::with_mask(id, !I::default())
    }

    /// Masked subscription: bits cleared in `mask` are ignored.
    pub fn with_mask(id: I, mask: I) -> Self {
        Self { id: id & mask, mask, matched: AtomicU32::new(0) }
    }

    /// Whether `id` matches this subscription; counts on match.
    pub fn matches(&self, id: I) -> bool {
        if id & self.mask == self.id {
            self.matched.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Number of messages this subscription matched so far.
    pub fn number_of_matched_messages(&self) -> u32 {
        self.matched.load(Ordering::Relaxed)
    }
}

/// Filter accepting ids matched by any registered subscription.
#[derive(Debug, Default)]
pub struct SubscriptionFilter<I> {
    subscriptions: Vec<Arc<BusSubscription<I>>>,
}

impl<I> SubscriptionFilter<I>
where
    I: Copy + PartialEq + std::ops::BitAnd<Output = I> + std::ops::Not<Output = I> + Default,
{
    /// Creates an empty filter, which accepts nothing.
    pub fn new() -> Self {
        Self { subscriptions: Vec::new() }
    }

    /// Adds a subscription. The handle stays shared so callers can read
    /// its match counter later.
    pub fn register_subscription(&mut self, subscription: Arc<BusSubscription<I>>) {
        self.subscriptions.push(subscription);
    }

    /// Number of registered subscriptions.
    pub fn number_of_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<I> MessageFilter<I> for SubscriptionFilter<I>
where
    I: Copy + PartialEq + std::ops::BitAnd<Output = I> + std::ops::Not<Output = I> + Default,
{
    fn matches(&self, id: &I, _payload: &[u8]) -> bool {
        self.subscriptions.iter().any(|subscription| subscription.matches(*id))
    }
}

/// Accepts ids within an inclusive `[min, max]` range.
#[derive(Debug, Default)]
pub struct RangeFilter<I> {
    min: I,
    max: I,
}

impl<I: Copy + PartialOrd + Default> RangeFilter<I> {
    /// Creates a filter with an empty default range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accepted id range.
    pub fn set_range(&mut self, min: I, max: I) {
        self.min = min;
        self.max = max;
    }
}

impl<I: Copy + PartialOrd> MessageFilter<I> for RangeFilter<I> {
    fn matches(&self, id: &I, _payload: &[u8]) -> bool {
        *id >= self.min && *id <= self.max
    }
}
