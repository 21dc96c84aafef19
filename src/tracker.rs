use crate::evdev::{DeviceInfo, Field, TouchInput};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Pressed,
    Moved,
    Stationary,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
    pub maj: i32,
    pub pressure: i32,
    pub state: ContactState,
}

impl Default for Contact {
    fn default() -> Contact {
        Contact {
            tracking_id: -1,
            x: 0,
            y: 0,
            maj: 1,
            pressure: 0,
            state: ContactState::Pressed,
        }
    }
}

pub struct ContactTracker {
    info: DeviceInfo,
    contacts: HashMap<i32, Contact>,
    last_contacts: HashMap<i32, Contact>,
    current_data: Contact,
    current_slot: i32,
    last_was_syn: bool,
}

impl ContactTracker {
    pub fn new(info: DeviceInfo) -> ContactTracker {
        ContactTracker {
            info,
            contacts: HashMap::new(),
            last_contacts: HashMap::new(),
            current_data: Contact::default(),
            current_slot: 0,
            last_was_syn: false,
        }
    }

    pub fn feed(&mut self, input: TouchInput) -> Vec<Contact> {
        match input {
            TouchInput::Field { field, value } => {
                self.apply(field, value);
                self.last_was_syn = false;
                Vec::new()
            }
            TouchInput::MtReport => {
                if !self.last_was_syn {
                    self.mt_report();
                }
                self.last_was_syn = true;
                Vec::new()
            }
            TouchInput::Report => {
                let points = self.sync();
                self.last_was_syn = true;
                points
            }
            TouchInput::Ignored => {
                self.last_was_syn = false;
                Vec::new()
            }
        }
    }

    fn slot_contact(&mut self) -> &mut Contact {
        self.contacts
            .entry(self.current_slot)
            .or_insert_with(Contact::default)
    }

    fn apply(&mut self, field: Field, value: i32) {
        let type_b = self.info.type_b;
        match field {
            Field::PositionX => {
                let value = value.clamp(self.info.x_min, self.info.x_max);
                self.current_data.x = value;
                if type_b {
                    self.slot_contact().x = value;
                }
            }
            Field::PositionY => {
                let value = value.clamp(self.info.y_min, self.info.y_max);
                self.current_data.y = value;
                if type_b {
                    self.slot_contact().y = value;
                }
            }
            Field::TrackingId => {
                self.current_data.tracking_id = value;
                if type_b {
                    if value == -1 {
                        self.slot_contact().state = ContactState::Released;
                    } else {
                        self.slot_contact().tracking_id = value;
                    }
                }
            }
            Field::ContactSize => {
                self.current_data.maj = value;
                if type_b {
                    self.slot_contact().maj = value;
                }
                if value == 0 {
                    if type_b {
                        self.slot_contact().state = ContactState::Released;
                    } else {
                        self.current_data.state = ContactState::Released;
                    }
                }
            }
            Field::Pressure => {
                let value = value.clamp(self.info.pressure_min, self.info.pressure_max);
                self.current_data.pressure = value;
                if type_b {
                    self.slot_contact().pressure = value;
                }
            }
            Field::SlotSelect => {
                self.current_slot = value;
            }
        }
    }

    // Type A only: one contact's field group is complete, move it into the
    // live map. Without a hardware tracking id the contact gets a temporary
    // key until identities are resolved at the frame boundary.
    fn mt_report(&mut self) {
        if self.info.type_b {
            return;
        }
        let key = if self.current_data.tracking_id >= 0 {
            self.current_data.tracking_id
        } else {
            self.contacts.len() as i32
        };
        self.contacts.insert(key, self.current_data);
        self.current_data = Contact::default();
    }

    fn sync(&mut self) -> Vec<Contact> {
        if !self.info.type_b && self.contacts.values().any(|c| c.tracking_id == -1) {
            self.assign_ids();
        }

        let mut points = Vec::new();

        let mut keys: Vec<i32> = self.contacts.keys().cloned().collect();
        keys.sort_unstable();
        for key in keys {
            let mut contact = match self.contacts.get(&key) {
                Some(contact) => *contact,
                None => continue,
            };
            match self.last_contacts.get(&key) {
                Some(previous) if previous.tracking_id == contact.tracking_id => {
                    if contact.state == ContactState::Released {
                        // report the last position the consumer has seen
                        contact.x = previous.x;
                        contact.y = previous.y;
                        contact.maj = previous.maj;
                    } else {
                        contact.state = if previous.x == contact.x && previous.y == contact.y {
                            ContactState::Stationary
                        } else {
                            ContactState::Moved
                        };
                    }
                }
                Some(_) => {
                    // the slot was re-used for a new touch without a release
                    // in between, the old session is reported below
                    contact.state = ContactState::Pressed;
                }
                None => {
                    if contact.state == ContactState::Released {
                        // released before any consumer saw it
                        self.contacts.remove(&key);
                        continue;
                    }
                }
            }
            self.contacts.insert(key, contact);
            points.push(contact);
        }

        // contacts that disappeared since the last frame
        let mut previous_keys: Vec<i32> = self.last_contacts.keys().cloned().collect();
        previous_keys.sort_unstable();
        for key in previous_keys {
            if let Some(&previous) = self.last_contacts.get(&key) {
                let gone = match self.contacts.get(&key) {
                    None => true,
                    Some(contact) => contact.tracking_id != previous.tracking_id,
                };
                if gone {
                    let mut contact = previous;
                    contact.state = ContactState::Released;
                    points.push(contact);
                }
            }
        }

        self.contacts
            .retain(|_, contact| contact.state != ContactState::Released);
        self.last_contacts = self.contacts.clone();
        if !self.info.type_b {
            self.contacts.clear();
        }

        if points.iter().all(|point| point.state == ContactState::Stationary) {
            return Vec::new();
        }
        points
    }

    // Greedy nearest-neighbor matching against the previous frame: assign the
    // globally closest (pending, candidate) pair, remove both, repeat.
    // Pending contacts left once the candidates run out are new touches.
    fn assign_ids(&mut self) {
        let mut candidates = self.last_contacts.clone();
        let mut pending = std::mem::take(&mut self.contacts);
        let mut new_contacts = HashMap::new();
        let mut max_id = -1;
        while !pending.is_empty() && !candidates.is_empty() {
            let mut best: Option<(i32, i32, i64)> = None;
            for (&key, contact) in &pending {
                if let Some((id, distance)) = find_closest_contact(&candidates, contact.x, contact.y)
                {
                    let closer = match best {
                        None => true,
                        Some((_, _, best_distance)) => distance < best_distance,
                    };
                    if closer {
                        best = Some((key, id, distance));
                    }
                }
            }
            match best {
                None => break,
                Some((key, id, _)) => {
                    if let Some(mut contact) = pending.remove(&key) {
                        contact.tracking_id = id;
                        new_contacts.insert(id, contact);
                    }
                    candidates.remove(&id);
                    max_id = max_id.max(id);
                }
            }
        }
        if candidates.is_empty() {
            let mut leftover: Vec<i32> = pending.keys().cloned().collect();
            leftover.sort_unstable();
            for key in leftover {
                if let Some(mut contact) = pending.remove(&key) {
                    max_id += 1;
                    contact.tracking_id = max_id;
                    new_contacts.insert(max_id, contact);
                }
            }
        }
        self.contacts = new_contacts;
    }
}

fn find_closest_contact(candidates: &HashMap<i32, Contact>, x: i32, y: i32) -> Option<(i32, i64)> {
    let mut best: Option<(i32, i64)> = None;
    for contact in candidates.values() {
        let dx = i64::from(x - contact.x);
        let dy = i64::from(y - contact.y);
        let distance = dx * dx + dy * dy;
        let closer = match best {
            None => true,
            Some((_, best_distance)) => distance < best_distance,
        };
        if closer {
            best = Some((contact.tracking_id, distance));
        }
    }
    best
}

#[cfg(test)]
pub mod test {
    use super::ContactState::*;
    use super::*;

    pub fn type_b_info() -> DeviceInfo {
        DeviceInfo {
            name: "test touch screen".to_string(),
            x_min: 0,
            x_max: 4095,
            y_min: 0,
            y_max: 4095,
            pressure_min: 0,
            pressure_max: 255,
            type_b: true,
        }
    }

    pub fn type_a_info() -> DeviceInfo {
        DeviceInfo {
            type_b: false,
            pressure_min: 0,
            pressure_max: 0,
            ..type_b_info()
        }
    }

    fn update(tracker: &mut ContactTracker, field: Field, value: i32) {
        tracker.feed(TouchInput::Field { field, value });
    }

    fn report(tracker: &mut ContactTracker) -> Vec<Contact> {
        tracker.feed(TouchInput::Report)
    }

    fn mt_report(tracker: &mut ContactTracker) {
        tracker.feed(TouchInput::MtReport);
    }

    mod type_b {
        use super::*;

        fn press_first_contact(tracker: &mut ContactTracker) {
            update(tracker, Field::SlotSelect, 0);
            update(tracker, Field::TrackingId, 5);
            update(tracker, Field::PositionX, 2048);
            update(tracker, Field::PositionY, 2048);
            update(tracker, Field::Pressure, 100);
        }

        #[test]
        fn reports_a_new_contact_as_pressed() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            assert_eq!(
                report(&mut tracker),
                vec![Contact {
                    tracking_id: 5,
                    x: 2048,
                    y: 2048,
                    maj: 1,
                    pressure: 100,
                    state: Pressed,
                }]
            );
        }

        #[test]
        fn reports_moved_when_the_position_changes() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::PositionX, 2148);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].tracking_id, 5);
            assert_eq!(points[0].state, Moved);
            assert_eq!((points[0].x, points[0].y), (2148, 2048));
        }

        #[test]
        fn suppresses_frames_where_every_contact_is_stationary() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::PositionX, 2048);
            assert_eq!(report(&mut tracker), vec![]);
            assert_eq!(report(&mut tracker), vec![]);
        }

        #[test]
        fn clamps_coordinates_to_the_device_range() {
            let mut tracker = ContactTracker::new(type_b_info());
            update(&mut tracker, Field::SlotSelect, 0);
            update(&mut tracker, Field::TrackingId, 5);
            update(&mut tracker, Field::PositionX, -50);
            update(&mut tracker, Field::PositionY, 9999);
            let points = report(&mut tracker);
            assert_eq!((points[0].x, points[0].y), (0, 4095));
        }

        #[test]
        fn clamps_pressure_to_the_device_range() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            update(&mut tracker, Field::Pressure, 1000);
            let points = report(&mut tracker);
            assert_eq!(points[0].pressure, 255);
        }

        #[test]
        fn releases_on_tracking_id_minus_one() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::TrackingId, -1);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].state, Released);
            assert_eq!(points[0].tracking_id, 5);
        }

        #[test]
        fn released_contacts_keep_their_last_reported_position() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::PositionX, 3000);
            update(&mut tracker, Field::TrackingId, -1);
            let points = report(&mut tracker);
            assert_eq!(points[0].state, Released);
            assert_eq!((points[0].x, points[0].y), (2048, 2048));
        }

        #[test]
        fn removes_released_contacts_from_the_live_map() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::TrackingId, -1);
            report(&mut tracker);
            // the slot comes back as a brand new touch
            update(&mut tracker, Field::TrackingId, 7);
            update(&mut tracker, Field::PositionX, 100);
            update(&mut tracker, Field::PositionY, 100);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].tracking_id, 7);
            assert_eq!(points[0].state, Pressed);
        }

        #[test]
        fn drops_touches_released_before_ever_being_reported() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            update(&mut tracker, Field::TrackingId, -1);
            assert_eq!(report(&mut tracker), vec![]);
            assert_eq!(report(&mut tracker), vec![]);
        }

        #[test]
        fn contact_size_zero_releases_even_if_position_updates_follow() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::ContactSize, 0);
            update(&mut tracker, Field::PositionX, 2500);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].state, Released);
        }

        #[test]
        fn slot_reuse_reports_release_and_press_in_one_frame() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            report(&mut tracker);
            update(&mut tracker, Field::TrackingId, 6);
            update(&mut tracker, Field::PositionX, 500);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].state), (6, Pressed));
            assert_eq!((points[1].tracking_id, points[1].state), (5, Released));
        }

        #[test]
        fn tracks_two_slots_independently() {
            let mut tracker = ContactTracker::new(type_b_info());
            press_first_contact(&mut tracker);
            update(&mut tracker, Field::SlotSelect, 1);
            update(&mut tracker, Field::TrackingId, 9);
            update(&mut tracker, Field::PositionX, 100);
            update(&mut tracker, Field::PositionY, 200);
            report(&mut tracker);
            // only the second slot moves
            update(&mut tracker, Field::PositionX, 150);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].state), (5, Stationary));
            assert_eq!((points[1].tracking_id, points[1].state), (9, Moved));
            assert_eq!((points[1].x, points[1].y), (150, 200));
        }
    }

    mod type_a {
        use super::*;

        fn feed_contact(tracker: &mut ContactTracker, x: i32, y: i32) {
            update(tracker, Field::PositionX, x);
            update(tracker, Field::PositionY, y);
            mt_report(tracker);
        }

        #[test]
        fn assigns_sequential_ids_when_hardware_reports_none() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            feed_contact(&mut tracker, 500, 500);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].state), (0, Pressed));
            assert_eq!((points[0].x, points[0].y), (10, 10));
            assert_eq!((points[1].tracking_id, points[1].state), (1, Pressed));
            assert_eq!((points[1].x, points[1].y), (500, 500));
        }

        #[test]
        fn keeps_identities_stable_across_frames() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            feed_contact(&mut tracker, 500, 500);
            report(&mut tracker);
            // delivered in the opposite order the next frame
            feed_contact(&mut tracker, 505, 505);
            feed_contact(&mut tracker, 15, 12);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].x, points[0].y), (0, 15, 12));
            assert_eq!(points[0].state, Moved);
            assert_eq!(
                (points[1].tracking_id, points[1].x, points[1].y),
                (1, 505, 505)
            );
            assert_eq!(points[1].state, Moved);
        }

        #[test]
        fn identities_do_not_swap_across_smooth_motion() {
            let mut tracker = ContactTracker::new(type_a_info());
            for step in 0..5 {
                feed_contact(&mut tracker, 10 + step * 3, 10);
                feed_contact(&mut tracker, 500 - step * 3, 500);
                let points = report(&mut tracker);
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].tracking_id, 0);
                assert_eq!((points[0].x, points[0].y), (10 + step * 3, 10));
                assert_eq!(points[1].tracking_id, 1);
                assert_eq!((points[1].x, points[1].y), (500 - step * 3, 500));
            }
        }

        #[test]
        fn matches_the_globally_closest_pair_first() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 0, 0);
            feed_contact(&mut tracker, 10, 0);
            report(&mut tracker);
            // both new positions are closest to the old contact at (0, 0),
            // only the globally closest one may claim it
            feed_contact(&mut tracker, 1, 0);
            feed_contact(&mut tracker, 2, 0);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].x), (0, 1));
            assert_eq!((points[1].tracking_id, points[1].x), (1, 2));
        }

        #[test]
        fn surplus_contacts_get_fresh_ids() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 0, 0);
            report(&mut tracker);
            feed_contact(&mut tracker, 1, 1);
            feed_contact(&mut tracker, 200, 200);
            feed_contact(&mut tracker, 300, 300);
            let points = report(&mut tracker);
            let mut ids: Vec<i32> = points.iter().map(|point| point.tracking_id).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![0, 1, 2]);
        }

        #[test]
        fn releases_contacts_that_vanish() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            feed_contact(&mut tracker, 500, 500);
            report(&mut tracker);
            feed_contact(&mut tracker, 15, 12);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 2);
            assert_eq!((points[0].tracking_id, points[0].state), (0, Moved));
            assert_eq!((points[1].tracking_id, points[1].state), (1, Released));
            assert_eq!((points[1].x, points[1].y), (500, 500));
        }

        #[test]
        fn released_vanished_contacts_do_not_reappear() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            feed_contact(&mut tracker, 500, 500);
            report(&mut tracker);
            feed_contact(&mut tracker, 15, 12);
            report(&mut tracker);
            feed_contact(&mut tracker, 16, 12);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!((points[0].tracking_id, points[0].state), (0, Moved));
        }

        #[test]
        fn uses_hardware_tracking_ids_when_present() {
            let mut tracker = ContactTracker::new(type_a_info());
            update(&mut tracker, Field::TrackingId, 42);
            update(&mut tracker, Field::PositionX, 10);
            update(&mut tracker, Field::PositionY, 10);
            mt_report(&mut tracker);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!((points[0].tracking_id, points[0].state), (42, Pressed));
        }

        #[test]
        fn ignores_an_mt_report_directly_after_a_sync() {
            let mut tracker = ContactTracker::new(type_a_info());
            assert_eq!(report(&mut tracker), vec![]);
            mt_report(&mut tracker);
            assert_eq!(report(&mut tracker), vec![]);
        }

        #[test]
        fn two_consecutive_mt_reports_insert_only_one_contact() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            mt_report(&mut tracker);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
        }

        #[test]
        fn contact_size_zero_releases_a_type_a_contact() {
            let mut tracker = ContactTracker::new(type_a_info());
            feed_contact(&mut tracker, 10, 10);
            report(&mut tracker);
            update(&mut tracker, Field::ContactSize, 0);
            update(&mut tracker, Field::PositionX, 10);
            update(&mut tracker, Field::PositionY, 10);
            mt_report(&mut tracker);
            let points = report(&mut tracker);
            assert_eq!(points.len(), 1);
            assert_eq!((points[0].tracking_id, points[0].state), (0, Released));
        }
    }
}
