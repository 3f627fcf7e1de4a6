// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small broadcast event bus over `flume` channels.

/// Fans every published event out to all live subscribers.
///
/// Each call to [`EventBus::subscribe`] creates an unbounded channel. Dropped
/// receivers are pruned on the next publish, and nothing is buffered when no
/// one is subscribed.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    subscribers: Vec<flume::Sender<T>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Registers a new subscriber.
    ///
    /// ## Returns
    /// The receiving end. Events published before this call are not delivered.
    pub fn subscribe(&mut self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(sender);
        log::debug!("EventBus subscriber added ({} live).", self.subscribers.len());
        receiver
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&mut self, event: T) {
        log::trace!("Publishing an event to {} subscribers.", self.subscribers.len());
        self.subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Returns `true` if at least one subscriber is registered.
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        Closed,
    }

    #[test]
    fn every_subscriber_receives_each_event() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(TestEvent::Resized {
            width: 1,
            height: 2,
        });
        bus.publish(TestEvent::Closed);

        for receiver in [&a, &b] {
            assert_eq!(
                receiver.try_recv(),
                Ok(TestEvent::Resized {
                    width: 1,
                    height: 2
                })
            );
            assert_eq!(receiver.try_recv(), Ok(TestEvent::Closed));
            assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let receiver = bus.subscribe();
        drop(receiver);
        assert!(bus.has_subscribers());
        bus.publish(TestEvent::Closed);
        assert!(!bus.has_subscribers());
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(TestEvent::Closed);
        let receiver = bus.subscribe();
        assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
    }
}
