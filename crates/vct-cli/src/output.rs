use anyhow::Result;
use serde::Serialize;
use vct_core::TeamResult;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub(crate) fn render_team(result: &TeamResult) -> String {
    let mut out = format!("Team ({} players)\n", result.team.len());
    for player in &result.team {
        let igl = if player.name == result.igl { "  [IGL]" } else { "" };
        out.push_str(&format!(
            "  {:<14} {:<11} {:<10} {} / {}{igl}\n",
            player.name, player.role, player.agent, player.region, player.league
        ));
    }
    for (heading, body) in [
        ("Strategy", &result.strategy),
        ("Strengths", &result.strengths),
        ("Weaknesses", &result.weaknesses),
    ] {
        out.push_str(&format!("\n{heading}\n  {body}\n"));
    }
    out.push_str(&format!("\nIGL: {}\n", result.igl));
    out
}
