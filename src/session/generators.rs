use async_trait::async_trait;

/// Trait for generating participant display names
#[async_trait]
pub trait DisplayNameGenerator: Send + Sync {
    async fn generate(&self) -> String;
}

/// Pet name-based display names, title-cased and space separated
/// ("Swift Tiger")
pub struct PetNameDisplayNameGenerator {
    words: u8,
}

impl PetNameDisplayNameGenerator {
    pub fn new(words: u8) -> Self {
        Self {
            words: words.max(1),
        }
    }
}

impl Default for PetNameDisplayNameGenerator {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl DisplayNameGenerator for PetNameDisplayNameGenerator {
    async fn generate(&self) -> String {
        let name = petname::Petnames::default().generate_one(self.words, " ");
        title_case(&name)
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
