//! Every human-readable template the service posts, plus the one parsing
//! seam that reads authorship back out of a candidate post.
//!
//! The community is French-speaking, so the announcements are French.

use chrono::NaiveDate;

use crate::types::{RoleId, UserId};

/// Weekly kick-off announcement, pinging both reporter roles.
pub fn weekly_announcement(reporter_role: RoleId, reporter_bordeaux_role: RoleId) -> String {
    format!(
        "Bonjour <@&{reporter_role}> <@&{reporter_bordeaux_role}> !\n\n\
         Une **nouvelle semaine** commence ✨ \n\
         C'est le moment idéal pour partager vos plus belles photos dans ce canal 📸\n\n\
         **__Rappel des règles__** :\n\n\
         • Vous pouvez poster **1 seule photo** jusqu'à samedi 00:00\n\
         • Merci de ne pas écrire de texte dans ce canal (photo uniquement)\n\
         • Les votes auront lieu de **samedi 00:00** à **dimanche 18:00** 🗳️\n\
         • Le ou la gagnant(e) sera annoncé(e) **dimanche soir** 🏆\n\n\
         Bonne chance à toutes et à tous, et amusez-vous bien 🎉"
    )
}

pub fn voting_thread_name(date: NaiveDate) -> String {
    format!("Votes photo — semaine du {}", date.format("%d/%m/%Y"))
}

pub fn monthly_thread_name(date: NaiveDate) -> String {
    format!("Concours photo du mois — {}", date.format("%d/%m/%Y"))
}

pub fn voting_intro(vote_emoji: &str) -> String {
    format!(
        "C'est l'heure des votes ! 🗳️\n\
         Réagissez avec {vote_emoji} sous votre photo préférée."
    )
}

pub fn monthly_intro(vote_emoji: &str) -> String {
    format!(
        "Voici les photos gagnantes des 4 dernières semaines 🏆\n\
         Votez avec {vote_emoji} pour élire la photo du mois !"
    )
}

/// Candidate post format. `parse_candidate_author` is its inverse and the
/// two must stay in sync.
pub fn candidate_post(author_id: UserId) -> String {
    format!("Photo de <@{author_id}> :")
}

/// Recover the author id from a candidate post.
///
/// This deliberately relies on the literal `Photo de <@id>` prefix the
/// service itself writes: any post in the voting thread that does not match
/// this exact shape is silently dropped from the tally.
pub fn parse_candidate_author(content: &str) -> Option<UserId> {
    let rest = content.strip_prefix("Photo de <@")?;
    let end = rest.find('>')?;
    rest[..end].parse().ok()
}

pub fn no_photos_this_week() -> String {
    "Aucune photo n'a été partagée cette semaine 😢 On se retrouve lundi prochain !".to_string()
}

pub fn no_eligible_winner() -> String {
    "Pas de nouveau gagnant cette semaine : toutes les photos en lice ont déjà gagné 😅".to_string()
}

pub fn weekly_winners(mentions: &[String], votes: u32) -> String {
    if mentions.len() == 1 {
        format!(
            "🏆 Bravo {} qui remporte le concours photo de la semaine avec {votes} vote(s) !",
            mentions[0]
        )
    } else {
        format!(
            "🏆 Égalité ! Bravo {} qui remportent le concours photo de la semaine avec {votes} vote(s) chacun !",
            join_mentions(mentions)
        )
    }
}

pub fn monthly_winners(mentions: &[String], votes: u32) -> String {
    if mentions.len() == 1 {
        format!(
            "🏆 Bravo {} qui remporte le concours photo du mois avec {votes} vote(s) !",
            mentions[0]
        )
    } else {
        format!(
            "🏆 Égalité ! Bravo {} qui remportent le concours photo du mois avec {votes} vote(s) chacun !",
            join_mentions(mentions)
        )
    }
}

pub fn results_backlink(jump_url: &str) -> String {
    format!("Les votes de la semaine sont ici : {jump_url}")
}

pub fn monthly_opened(jump_url: &str) -> String {
    format!("Le concours photo du mois est ouvert ! Venez voter : {jump_url}")
}

// Rejection DMs sent when a post is removed from the photo channel.

pub fn dm_no_image() -> String {
    "Bonjour ! Ton message dans le canal photo a été retiré : seul le partage d'une photo y est \
     autorisé (pas de texte). N'hésite pas à reposter avec une photo 📸"
        .to_string()
}

pub fn dm_multiple_images() -> String {
    "Bonjour ! Ton message dans le canal photo a été retiré : une seule photo par personne et par \
     semaine. Reposte ta préférée 📸"
        .to_string()
}

pub fn dm_already_submitted() -> String {
    "Bonjour ! Ton message dans le canal photo a été retiré : tu as déjà partagé une photo cette \
     semaine. Supprime la première si tu préfères celle-ci 📸"
        .to_string()
}

fn join_mentions(mentions: &[String]) -> String {
    match mentions.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} et {last}", rest.join(", ")),
        _ => mentions.join(""),
    }
}
