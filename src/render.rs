use crate::game::{Display, Frame};

use macroquad::prelude::*;

pub const SCORE_AREA_HEIGHT: f32 = 40.0;
const SCORE_TEXT_SIZE: f32 = 30.0;

const PLAYER_COLOR: Color = Color::new(0.11, 0.55, 0.96, 1.0);
const OBSTACLE_COLOR: Color = Color::new(0.31, 0.31, 0.31, 1.0);
const HIT_OBSTACLE_COLOR: Color = Color::new(0.71, 0.71, 0.71, 1.0);

/// Draws game frames into the current macroquad window. Only usable from
/// inside a macroquad main loop.
#[derive(Debug, Default)]
pub struct MacroquadDisplay;

impl MacroquadDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl Display for MacroquadDisplay {
    fn draw(&mut self, frame: &Frame<'_>) {
        let screen_w = screen_width();
        let screen_h = screen_height();

        clear_background(WHITE);

        // score area

        let score_area = Rect::new(0.0, 0.0, screen_w, SCORE_AREA_HEIGHT);
        draw_rectangle(score_area.x, score_area.y, score_area.w, score_area.h, Color::new(0.1, 0.1, 0.2, 1.0));

        let score_text = format!("Score: {}", frame.score);
        let text_dims = measure_text(&score_text, None, SCORE_TEXT_SIZE as u16, 1.0);
        draw_text(
            &score_text,
            score_area.w / 2.0 - text_dims.width / 2.0,
            score_area.y + score_area.h / 2.0 + text_dims.height / 2.0,
            SCORE_TEXT_SIZE,
            WHITE,
        );

        // field, scaled to whatever is left of the window

        let field = Rect::new(0.0, score_area.h, screen_w, screen_h - score_area.h);
        let scale_x = field.w / frame.width;
        let scale_y = field.h / frame.height;
        let scale_r = scale_x.min(scale_y);

        for obstacle in frame.obstacles {
            let color = if obstacle.hit { HIT_OBSTACLE_COLOR } else { OBSTACLE_COLOR };
            draw_circle(
                field.x + obstacle.x * scale_x,
                field.y + obstacle.y * scale_y,
                obstacle.radius * scale_r,
                color,
            );
        }

        draw_circle(
            field.x + frame.player.x * scale_x,
            field.y + frame.player.y * scale_y,
            frame.player.radius * scale_r,
            PLAYER_COLOR,
        );
    }
}
