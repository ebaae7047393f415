use crate::{foundation::core::Rgb8, order::ConnectionMode};

/// Human color name for the common cases, `RGB(r, g, b)` otherwise.
pub fn describe_color(c: Rgb8) -> String {
    let Rgb8 { r, g, b } = c;
    if r < 100 && g < 100 && b > 150 {
        "blue".to_string()
    } else if r > 150 && g < 100 && b < 100 {
        "red".to_string()
    } else if r > 200 && g > 200 && b > 200 {
        "white".to_string()
    } else if r < 50 && g < 50 && b < 50 {
        "black".to_string()
    } else {
        format!("RGB({r}, {g}, {b})")
    }
}

/// Instruction text for one task. Pure function of its inputs.
pub fn prompt_for(n: usize, mode: ConnectionMode, dot_color: Rgb8, line_color: Rgb8) -> String {
    let dot = describe_color(dot_color);
    let line = describe_color(line_color);

    let scene = format!(
        "The scene shows {n} circular objects (dots) scattered across a white background. \
         Each object is a filled {dot} circle with a black outline. \
         Each circle is labeled with a number from 1 to {n}, displayed in black text centered \
         on the circle. "
    );
    let segment = format!(
        "Each line should be drawn as a {line} straight line segment connecting the centers of \
         the two consecutive numbered dots. "
    );

    let body = match mode {
        ConnectionMode::Sequential => format!(
            "Starting from dot 1, draw straight lines connecting the dots in strict numerical \
             order: first draw a line from dot 1 to dot 2, then from dot 2 to dot 3, continuing \
             sequentially until you reach dot {n}. {segment}Continue this process until all {n} \
             dots are connected in numerical sequence, forming a continuous path from dot 1 to \
             dot {n}."
        ),
        ConnectionMode::Path => format!(
            "The numbers indicate the order in which the dots should be visited. Starting from \
             dot 1, draw straight lines connecting the dots following the numbered sequence: \
             draw a line from dot 1 to dot 2, then from dot 2 to dot 3, continuing in order until \
             you reach dot {n}. {segment}Continue this process until all {n} dots are connected \
             following the numbered sequence, forming a complete continuous path that visits \
             each dot exactly once in the order indicated by their numbers."
        ),
        ConnectionMode::Random => format!(
            "Starting from dot 1, draw straight lines connecting the dots in the order indicated \
             by their numbers: draw a line from dot 1 to dot 2, then from dot 2 to dot 3, \
             continuing in the numbered sequence until you reach dot {n}. {segment}Continue this \
             process until all {n} dots are connected following the numbered order, forming a \
             continuous path from dot 1 to dot {n}."
        ),
    };

    scene + &body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors() {
        assert_eq!(describe_color(Rgb8::new(50, 50, 200)), "blue");
        assert_eq!(describe_color(Rgb8::new(200, 50, 50)), "red");
        assert_eq!(describe_color(Rgb8::WHITE), "white");
        assert_eq!(describe_color(Rgb8::BLACK), "black");
        assert_eq!(describe_color(Rgb8::new(0, 150, 0)), "RGB(0, 150, 0)");
    }

    #[test]
    fn prompt_mentions_count_and_colors() {
        let p = prompt_for(
            7,
            ConnectionMode::Sequential,
            Rgb8::new(50, 50, 200),
            Rgb8::new(200, 50, 50),
        );
        assert!(p.contains("shows 7 circular objects"));
        assert!(p.contains("filled blue circle"));
        assert!(p.contains("red straight line segment"));
        assert!(p.contains("from dot 1 to dot 7."));
        assert!(!p.contains("  "));
    }

    #[test]
    fn each_mode_has_its_own_wording() {
        let c = Rgb8::new(50, 50, 200);
        let texts: Vec<String> = ConnectionMode::ALL
            .iter()
            .map(|m| prompt_for(5, *m, c, c))
            .collect();
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
        assert_ne!(texts[0], texts[2]);
        assert!(texts[1].contains("visits each dot exactly once"));
    }
}
