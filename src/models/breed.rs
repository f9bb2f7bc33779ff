/// Detector class index → breed name.
pub const BREED_NAMES: [&str; 32] = [
    "Alambadi",
    "Amrit Mahal",
    "Banni",
    "Bargur",
    "Brown Swiss",
    "Dangi",
    "Deoni",
    "Gir",
    "Guernsey",
    "Hallikar",
    "Hariana",
    "Holstein Friesian",
    "Jaffarabadi",
    "Jersey",
    "Kangayam",
    "Kankrej",
    "Kasaragod",
    "Khillari",
    "Malnad Gidda",
    "Nagori",
    "Nagpuri",
    "Nili-Ravi",
    "Nimari",
    "Ongole",
    "Pulikulam",
    "Red Dane",
    "Red Sindhi",
    "Sahiwal",
    "Tharparkar",
    "Toda",
    "Umblachery",
    "Vechur",
];

pub const UNKNOWN_BREED: &str = "Unknown Breed";

pub fn breed_label(class_id: usize) -> &'static str {
    BREED_NAMES.get(class_id).copied().unwrap_or(UNKNOWN_BREED)
}
