use std::io::{self, Write, stdout};
use crossterm::{cursor, queue, style::{Color, SetForegroundColor, ResetColor, SetAttribute, Attribute}};

use crate::model::ContainerUIState;
use crate::registry::{ContainerStatus, FilterMode, RegistrySnapshot};
use super::shared::{truncate_str, writeln, write_selectable};

pub fn render_containers(
    snapshot: &RegistrySnapshot,
    ui_state: &ContainerUIState,
    filter: FilterMode,
    status_message: &Option<String>,
) -> io::Result<()> {
    let mut out = stdout();
    queue!(out, cursor::MoveTo(0, 0))?;

    let size = crossterm::terminal::size()?;

    render_rollup_bar(&mut out, snapshot, filter)?;

    if snapshot.rows.is_empty() {
        writeln(&mut out, "")?;
        writeln(&mut out, "  No containers found.")?;
        writeln(&mut out, "")?;
        if filter == FilterMode::RunningOnly {
            writeln(&mut out, "  Filter is set to running only; press f to show all.")?;
        } else {
            writeln(&mut out, "  Make sure Docker is running and you have containers.")?;
        }
    } else {
        writeln(&mut out, "")?;

        // Column header
        queue!(io::stdout(), SetAttribute(Attribute::Bold))?;
        write!(out, "  {:<14} {:<20} {:<13} {:<26} {:<22} {:>6} {:>9} {:>8}",
            "ID", "NAME", "STATUS", "IMAGE", "PORTS", "CPU %", "MEM", "UPTIME")?;
        queue!(io::stdout(), SetAttribute(Attribute::Reset))?;
        write!(out, "\r\n")?;

        for (idx, row) in snapshot.rows.iter().enumerate() {
            let selected = idx == ui_state.selected_index;

            let line = format!("  {:<14} {:<20} {:<13} {:<26} {:<22} {:>6} {:>9} {:>8}",
                row.short_id,
                truncate_str(&row.name, 18),
                row.status.label(),
                truncate_str(&row.image, 24),
                truncate_str(&row.ports, 20),
                row.cpu,
                row.mem,
                row.uptime,
            );

            if !selected {
                queue!(io::stdout(), SetForegroundColor(status_color(&row.status)))?;
            }
            write_selectable(&mut out, &line, selected)?;
            if !selected {
                queue!(io::stdout(), ResetColor)?;
            }
        }
    }

    // Status message (action feedback)
    if let Some(msg) = status_message {
        writeln(&mut out, "")?;
        queue!(io::stdout(), SetForegroundColor(Color::Yellow))?;
        writeln(&mut out, &format!("  {}", msg))?;
        queue!(io::stdout(), ResetColor)?;
    }

    // Footer
    let help = "q: Quit | ↑/↓: Navigate | l: Logs | t: Start | s: Stop | r: Restart | d: Remove | f: Filter";
    let help_y = size.1.saturating_sub(1);
    queue!(
        out,
        cursor::MoveTo(1, help_y),
        SetForegroundColor(Color::DarkGrey),
        crossterm::style::Print(format!("{:<width$}", help, width = size.0 as usize)),
        ResetColor
    )?;

    out.flush()?;
    Ok(())
}

fn render_rollup_bar(
    out: &mut impl Write,
    snapshot: &RegistrySnapshot,
    filter: FilterMode,
) -> io::Result<()> {
    let counts = &snapshot.counts;

    queue!(io::stdout(), SetAttribute(Attribute::Bold))?;
    write!(out, "  Containers: {}  ", counts.total)?;
    queue!(io::stdout(), SetForegroundColor(Color::Green))?;
    write!(out, "Running: {}  ", counts.running)?;
    queue!(io::stdout(), SetForegroundColor(Color::Red))?;
    write!(out, "Stopped: {}  ", counts.stopped)?;
    if counts.paused > 0 {
        queue!(io::stdout(), SetForegroundColor(Color::Yellow))?;
        write!(out, "Paused: {}  ", counts.paused)?;
    }
    queue!(io::stdout(), ResetColor, SetAttribute(Attribute::Reset))?;

    queue!(io::stdout(), SetForegroundColor(Color::DarkGrey))?;
    let stamp = if snapshot.taken_at.is_empty() {
        "..."
    } else {
        &snapshot.taken_at
    };
    write!(out, "| showing: {} | last update: {}", filter.label(), stamp)?;
    queue!(io::stdout(), ResetColor)?;
    write!(out, "\r\n")?;
    Ok(())
}

fn status_color(status: &ContainerStatus) -> Color {
    match status {
        ContainerStatus::Running => Color::Green,
        ContainerStatus::Exited => Color::Red,
        ContainerStatus::Paused => Color::Yellow,
        ContainerStatus::Other(_) => Color::DarkGrey,
    }
}
