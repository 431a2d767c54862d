//! Synthetic data for provisioned objects

use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "dusty", "eager", "frosty", "gentle", "hollow", "icy", "jolly",
    "keen", "lucky", "misty", "noble", "olive", "proud", "quiet", "rapid", "silent", "tidy",
];

const NOUNS: &[&str] = &[
    "badger", "cedar", "delta", "ember", "falcon", "glacier", "harbor", "island", "juniper",
    "kestrel", "lagoon", "meadow", "nebula", "orchid", "pebble", "quartz", "raven", "summit",
    "thistle", "willow",
];

const MAIL_DOMAINS: &[&str] = &[
    "example.com", "example.net", "example.org", "mail.test", "corp.test",
];

fn pick<'a, R: Rng + ?Sized>(words: &[&'a str], rng: &mut R) -> &'a str {
    words.choose(rng).copied().unwrap_or("x")
}

/// Random lowercase, hyphenated tenant name such as `misty-harbor-4821`
pub fn tenant_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}-{}-{}",
        pick(ADJECTIVES, rng),
        pick(NOUNS, rng),
        rng.random_range(1000..10000)
    )
}

/// Random e-mail address used as a username
pub fn email<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}.{}{}@{}",
        pick(ADJECTIVES, rng),
        pick(NOUNS, rng),
        rng.random_range(0..100_000),
        pick(MAIL_DOMAINS, rng)
    )
}

/// Random dotted-quad string used for scope and secret names
pub fn ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    let octets: [u8; 4] = rng.random();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

/// Random alphanumeric payload of exactly `len` characters
pub fn alphanumeric<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
