//! Tree projection - 2-D placement of a person's direct relatives
//!
//! Pure presentation geometry. Each relation type has a base angle around
//! the center person; relatives sharing a type fan out symmetrically around
//! it. Coordinates are percentages of the drawing area.

use crate::edges::DirectRelations;
use crate::person::PersonId;
use crate::relation::RelationType;

/// Geometry parameters for [`project`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// X coordinate of the center person
    pub origin_x: f64,
    /// Y coordinate of the center person
    pub origin_y: f64,
    /// Distance of every relative from the center
    pub radius: f64,
    /// Angular gap between relatives of the same type, in degrees
    pub fan_step_degrees: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 50.0,
            radius: 35.0,
            fan_step_degrees: 30.0,
        }
    }
}

/// A relative placed on the layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedRelative {
    /// The relative
    pub person: PersonId,
    /// How the relative relates to the center person
    pub relation: RelationType,
    /// Final angle in degrees
    pub angle_degrees: f64,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

/// Base angle of a relation type, in degrees from the positive x axis
pub fn base_angle(relation: RelationType) -> f64 {
    match relation {
        RelationType::Father => -90.0,
        RelationType::Mother => -45.0,
        RelationType::Spouse => 0.0,
        RelationType::Brother => 45.0,
        RelationType::Sister => 90.0,
        RelationType::Son => 135.0,
        RelationType::Daughter => 180.0,
    }
}

/// Place every direct relative around the center person
pub fn project(relations: &DirectRelations, params: &LayoutParams) -> Vec<PlacedRelative> {
    let mut placed = Vec::with_capacity(relations.len());

    for relation in RelationType::ALL {
        let targets = relations.get(relation);
        let total = targets.len();
        for (index, person) in targets.into_iter().enumerate() {
            let offset = if total > 1 {
                (index as f64 - (total as f64 - 1.0) / 2.0) * params.fan_step_degrees
            } else {
                0.0
            };
            let angle_degrees = base_angle(relation) + offset;
            let theta = angle_degrees.to_radians();
            placed.push(PlacedRelative {
                person,
                relation,
                angle_degrees,
                x: params.origin_x + params.radius * theta.cos(),
                y: params.origin_y + params.radius * theta.sin(),
            });
        }
    }

    placed
}
