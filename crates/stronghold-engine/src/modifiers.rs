//! The modifier collector: situational bonuses and penalties applicable
//! to a check at roll time. A pure function of the document snapshot.

use stronghold_core::modifier::{Modifier, ModifierKind, ModifierSource};
use stronghold_core::resource::Resource;
use stronghold_registry::CheckDefinition;
use stronghold_store::SessionDocument;

/// The status penalty imposed by the kingdom's current unrest.
fn unrest_penalty(unrest: i64) -> i32 {
    match unrest {
        i64::MIN..=0 => 0,
        1..=4 => -1,
        5..=9 => -2,
        10..=14 => -3,
        _ => -4,
    }
}

/// Computes the situational modifiers for attempting `definition` with
/// `skill` against the current document state.
#[must_use]
pub fn collect(doc: &SessionDocument, definition: &CheckDefinition, skill: &str) -> Vec<Modifier> {
    let mut modifiers = Vec::new();

    let penalty = unrest_penalty(doc.kingdom.resource(Resource::Unrest));
    if penalty != 0 {
        modifiers.push(
            Modifier::new("Unrest", penalty, ModifierKind::Status)
                .with_source(ModifierSource::Unrest),
        );
    }

    for bonus in &doc.kingdom.structures {
        if bonus.skill == skill {
            modifiers.push(
                Modifier::new(bonus.structure.clone(), bonus.value, ModifierKind::Item)
                    .with_source(ModifierSource::Structure),
            );
        }
    }

    for aid in &doc.kingdom.aid {
        if aid.check_id == definition.id {
            modifiers.push(
                Modifier::new(
                    format!("Aid ({})", aid.provider),
                    aid.value,
                    ModifierKind::Circumstance,
                )
                .with_source(ModifierSource::Aid),
            );
        }
    }

    for custom in &doc.kingdom.custom_modifiers {
        let mut modifier = custom.clone();
        if modifier.source.is_none() {
            modifier.source = Some(ModifierSource::Custom);
        }
        modifiers.push(modifier);
    }

    modifiers
}
