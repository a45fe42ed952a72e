//! Person command implementation.

use super::parse_person_id;
use crate::cli::{PersonAction, PersonArgs};
use crate::error::Result;
use crate::output::Formatter;
use kindred_domain::{KinshipStore, NewPerson, Person, Sex};
use kindred_engine::{EngineError, KinshipEngine};
use std::fmt::Display;

/// Execute a person subcommand.
pub fn execute_person<S: KinshipStore>(
    args: PersonArgs,
    engine: &mut KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    match args.action {
        PersonAction::Add {
            handle,
            first_name,
            last_name,
            sex,
            photo,
        } => {
            let sex = Sex::parse(&sex).map_err(EngineError::from)?;
            let attrs = NewPerson::new(handle, first_name, last_name, sex).with_photo(photo);
            let person = engine.create_person(attrs)?;

            if formatter.is_quiet() || formatter.is_json() {
                return show(&person, engine, formatter);
            }
            let family = engine.get_cluster(person.cluster)?;
            Ok(formatter.success(&format!(
                "Registered {} ({}) in family {}",
                person.handle, person.id, family.name
            )))
        }
        PersonAction::Show { id } => {
            let person = engine.get_person(parse_person_id(&id)?)?;
            show(&person, engine, formatter)
        }
        PersonAction::Find { handle } => {
            let person = engine.find_person(&handle)?;
            show(&person, engine, formatter)
        }
        PersonAction::Remove { handle } => {
            let person = engine.find_person(&handle)?;
            engine.remove_person(person.id)?;
            if formatter.is_quiet() {
                return Ok(person.id.to_string());
            }
            Ok(formatter.success(&format!("Removed {}", person.handle)))
        }
    }
}

fn show<S: KinshipStore>(
    person: &Person,
    engine: &KinshipEngine<S>,
    formatter: &Formatter,
) -> Result<String>
where
    S::Error: Display,
{
    let family = engine.get_cluster(person.cluster)?;
    formatter.format_person(person, &family.name)
}
