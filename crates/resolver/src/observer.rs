//! Explicit keyed observer registration.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<V> = Box<dyn FnMut(&V)>;

/// Callbacks keyed by `K`, invoked in subscription order on [`Observers::notify`].
pub struct Observers<K, V> {
	next_id: u64,
	subscribers: FxHashMap<K, Vec<(SubscriptionId, Callback<V>)>>,
}

impl<K, V> Default for Observers<K, V> {
	fn default() -> Self {
		Self {
			next_id: 0,
			subscribers: FxHashMap::default(),
		}
	}
}

impl<K, V> std::fmt::Debug for Observers<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Observers")
			.field("keys", &self.subscribers.len())
			.field("next_id", &self.next_id)
			.finish()
	}
}

impl<K: Eq + Hash, V> Observers<K, V> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&mut self, key: K, callback: impl FnMut(&V) + 'static) -> SubscriptionId {
		self.next_id += 1;
		let id = SubscriptionId(self.next_id);
		self.subscribers.entry(key).or_default().push((id, Box::new(callback)));
		id
	}

	/// Removes one subscription. Returns `false` if it was already gone.
	pub fn unsubscribe(&mut self, key: &K, id: SubscriptionId) -> bool {
		let Some(callbacks) = self.subscribers.get_mut(key) else {
			return false;
		};
		let before = callbacks.len();
		callbacks.retain(|(held, _)| *held != id);
		let removed = callbacks.len() != before;
		if callbacks.is_empty() {
			self.subscribers.remove(key);
		}
		removed
	}

	/// Invokes every callback subscribed to `key`. Returns how many ran.
	pub fn notify(&mut self, key: &K, value: &V) -> usize {
		let Some(callbacks) = self.subscribers.get_mut(key) else {
			return 0;
		};
		for (_, callback) in callbacks.iter_mut() {
			callback(value);
		}
		callbacks.len()
	}

	pub fn subscriber_count(&self, key: &K) -> usize {
		self.subscribers.get(key).map_or(0, Vec::len)
	}

	pub fn clear(&mut self) {
		self.subscribers.clear();
	}
}
