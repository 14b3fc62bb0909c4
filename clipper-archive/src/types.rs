use serde::Deserialize;

/// Response envelope of a create: the server echoes only the assigned id.
#[derive(Debug, Deserialize)]
pub struct CreatedArticle {
    #[serde(rename = "_id")]
    pub id: String,
}
