//! Fixed club registry.

use insti_core::ClubId;

/// A club that can own events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Club {
    pub id: ClubId,
    pub name: &'static str,
    pub logo: &'static str,
}

const REGISTRY: &[(&str, &str, &str)] = &[
    ("club_webops", "WebOps Club IITM", "/assets/webops-logo.svg"),
    (
        "club_blockchain",
        "Blockchain Club IITM",
        "/assets/blockchain-logo.svg",
    ),
];

/// All registered clubs, in registry order.
pub fn club_registry() -> Vec<Club> {
    REGISTRY
        .iter()
        .map(|(id, name, logo)| Club {
            id: ClubId::new(*id),
            name,
            logo,
        })
        .collect()
}

pub fn club_by_id(id: &ClubId) -> Option<Club> {
    club_registry().into_iter().find(|club| &club.id == id)
}

/// Club assigned to club accounts that sign up without naming one.
pub fn default_club() -> Club {
    let (id, name, logo) = REGISTRY[0];
    Club {
        id: ClubId::new(id),
        name,
        logo,
    }
}
