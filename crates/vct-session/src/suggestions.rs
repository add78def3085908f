pub const PREDEFINED_PROMPTS: [&str; 6] = [
    "Build a team using only players from VCT International.",
    "Build a team using only players from VCT Challengers.",
    "Build a team using only players from VCT Game Changers.",
    "Build a team that includes at least two players from an underrepresented group.",
    "Build a team with players from at least three different regions.",
    "Build a team that includes at least two semi-professional players.",
];

pub fn suggestions() -> &'static [&'static str] {
    &PREDEFINED_PROMPTS
}

pub fn suggestion(index: usize) -> Option<&'static str> {
    PREDEFINED_PROMPTS.get(index).copied()
}
