use crate::{
    api::{MapWidget, MarkerId},
    entities::Location,
    error::{invalid_input_error, Error},
};

/// A picked location together with the marker drawn for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub location: Location,
    pub marker: MarkerId,
}

/// Ordered stops. Marker labels are always the 1-based position.
#[derive(Debug, Default)]
pub struct StopRegistry {
    stops: Vec<Stop>,
}

impl StopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn locations(&self) -> Vec<Location> {
        self.stops.iter().map(|stop| stop.location.clone()).collect()
    }

    /// Returns the new stop's label.
    pub fn add(&mut self, map: &mut dyn MapWidget, location: Location) -> usize {
        let label = self.stops.len() + 1;
        let marker = map.add_marker(&location, &label.to_string());

        self.stops.push(Stop { location, marker });

        label
    }

    pub fn remove(&mut self, map: &mut dyn MapWidget, index: usize) -> Result<Location, Error> {
        if index >= self.stops.len() {
            return Err(invalid_input_error().with_message(format!(
                "no location at index {} (have {})",
                index,
                self.stops.len()
            )));
        }

        let removed = self.stops.remove(index);
        map.remove_marker(removed.marker);

        for (i, stop) in self.stops.iter().enumerate().skip(index) {
            map.relabel_marker(stop.marker, &(i + 1).to_string());
        }

        Ok(removed.location)
    }

    pub fn clear(&mut self, map: &mut dyn MapWidget) {
        for stop in self.stops.drain(..) {
            map.remove_marker(stop.marker);
        }
    }

    pub fn list_entries(&self) -> Vec<String> {
        self.stops
            .iter()
            .enumerate()
            .map(|(i, stop)| format!("{}. {}", i + 1, stop.location.name))
            .collect()
    }
}
