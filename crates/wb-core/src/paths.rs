//! Path conventions for documents and blobs.

use crate::document::{CollectionPath, DocPath};
use crate::models::{ListId, UserId, WordId};

/// Prefix shared by every word image blob.
pub const WORD_IMAGES: &str = "wordImages";

pub fn lists(user: &UserId) -> CollectionPath {
    CollectionPath::new(format!("users/{user}/vocabLists"))
}

pub fn list(user: &UserId, list: &ListId) -> DocPath {
    lists(user).doc(list.as_str())
}

pub fn words(user: &UserId, list_id: &ListId) -> CollectionPath {
    list(user, list_id).sub("words")
}

pub fn word(user: &UserId, list_id: &ListId, word: &WordId) -> DocPath {
    words(user, list_id).doc(word.as_str())
}

/// Flat pre-migration word collection, keyed by word text.
pub fn legacy_words(user: &UserId) -> CollectionPath {
    CollectionPath::new(format!("users/{user}/vocabulary"))
}

/// Deterministic upload key of a word's file image.
pub fn word_image_key(user: &UserId, word: &WordId) -> String {
    format!("{WORD_IMAGES}/{user}/{word}")
}

/// Directory under which the relay stores re-hosted images of a user.
pub fn relay_image_dir(user: &UserId) -> String {
    format!("{WORD_IMAGES}/{user}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_documents_nest_under_their_list() {
        let user = UserId::from("u1");
        let path = word(&user, &ListId::from("L1"), &WordId::from("w1"));
        assert_eq!(path.to_string(), "users/u1/vocabLists/L1/words/w1");
        assert_eq!(path.collection(), &words(&user, &ListId::from("L1")));
    }

    #[test]
    fn image_keys_are_per_user_and_word() {
        let user = UserId::from("u1");
        assert_eq!(word_image_key(&user, &WordId::from("w1")), "wordImages/u1/w1");
        assert_eq!(relay_image_dir(&user), "wordImages/u1");
    }
}
