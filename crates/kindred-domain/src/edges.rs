//! Typed direct-relation edge lists owned by a person

use crate::person::PersonId;
use crate::relation::RelationType;

/// The direct relatives of one person, one list per relation type
///
/// Father, mother and spouse hold at most one id. The sibling and child
/// lists behave as sets that keep insertion order, which the tree projection
/// uses to fan relatives out deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectRelations {
    /// Father
    pub father: Option<PersonId>,
    /// Mother
    pub mother: Option<PersonId>,
    /// Spouse
    pub spouse: Option<PersonId>,
    /// Brothers
    pub brother: Vec<PersonId>,
    /// Sisters
    pub sister: Vec<PersonId>,
    /// Sons
    pub son: Vec<PersonId>,
    /// Daughters
    pub daughter: Vec<PersonId>,
}

impl DirectRelations {
    /// Record `target` under `relation`
    ///
    /// Singular types overwrite; plural types add the target if absent.
    /// Returns whether anything changed, so an idempotent write can be skipped.
    pub fn set(&mut self, relation: RelationType, target: PersonId) -> bool {
        match relation {
            RelationType::Father => replace(&mut self.father, target),
            RelationType::Mother => replace(&mut self.mother, target),
            RelationType::Spouse => replace(&mut self.spouse, target),
            RelationType::Brother => insert(&mut self.brother, target),
            RelationType::Sister => insert(&mut self.sister, target),
            RelationType::Son => insert(&mut self.son, target),
            RelationType::Daughter => insert(&mut self.daughter, target),
        }
    }

    /// Targets recorded under `relation`
    pub fn get(&self, relation: RelationType) -> Vec<PersonId> {
        match relation {
            RelationType::Father => self.father.into_iter().collect(),
            RelationType::Mother => self.mother.into_iter().collect(),
            RelationType::Spouse => self.spouse.into_iter().collect(),
            RelationType::Brother => self.brother.clone(),
            RelationType::Sister => self.sister.clone(),
            RelationType::Son => self.son.clone(),
            RelationType::Daughter => self.daughter.clone(),
        }
    }

    /// Whether `target` is recorded under `relation`
    pub fn contains(&self, relation: RelationType, target: PersonId) -> bool {
        match relation {
            RelationType::Father => self.father == Some(target),
            RelationType::Mother => self.mother == Some(target),
            RelationType::Spouse => self.spouse == Some(target),
            RelationType::Brother => self.brother.contains(&target),
            RelationType::Sister => self.sister.contains(&target),
            RelationType::Son => self.son.contains(&target),
            RelationType::Daughter => self.daughter.contains(&target),
        }
    }

    /// Remove `target` from every list; returns whether anything changed
    pub fn detach(&mut self, target: PersonId) -> bool {
        let mut changed = false;
        for slot in [&mut self.father, &mut self.mother, &mut self.spouse] {
            if *slot == Some(target) {
                *slot = None;
                changed = true;
            }
        }
        for list in [
            &mut self.brother,
            &mut self.sister,
            &mut self.son,
            &mut self.daughter,
        ] {
            let before = list.len();
            list.retain(|id| *id != target);
            changed |= list.len() != before;
        }
        changed
    }

    /// All edges as `(relation, target)` pairs in relation-type order
    pub fn iter(&self) -> impl Iterator<Item = (RelationType, PersonId)> + '_ {
        RelationType::ALL
            .into_iter()
            .flat_map(move |relation| self.get(relation).into_iter().map(move |id| (relation, id)))
    }

    /// Distinct relatives across all lists
    pub fn relatives(&self) -> Vec<PersonId> {
        let mut ids: Vec<PersonId> = Vec::new();
        for (_, id) in self.iter() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Total number of edges
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether there are no edges at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn replace(slot: &mut Option<PersonId>, target: PersonId) -> bool {
    if *slot == Some(target) {
        return false;
    }
    *slot = Some(target);
    true
}

fn insert(list: &mut Vec<PersonId>, target: PersonId) -> bool {
    if list.contains(&target) {
        return false;
    }
    list.push(target);
    true
}
