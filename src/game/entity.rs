use crate::config::{GameConfig, ObstacleConfig};
use super::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed: f32,
    pub padding: f32,
    field_width: f32,
}

impl Player {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            x: config.width / 2.0,
            y: config.height - config.player.bottom_offset,
            radius: config.player.radius,
            speed: config.player.speed,
            padding: config.player.padding,
            field_width: config.width,
        }
    }

    pub fn min_x(&self) -> f32 {self.padding}
    pub fn max_x(&self) -> f32 {self.field_width - self.padding}

    pub fn go_left(&mut self) {
        self.x = (self.x - self.speed).max(self.min_x());
    }

    pub fn go_right(&mut self) {
        self.x = (self.x + self.speed).min(self.max_x());
    }

    // movement saturates at the bounds instead of failing
    pub fn moved(&self, action: Action) -> Player {
        let mut next = self.clone();
        match action {
            Action::Left => next.go_left(),
            Action::Right => next.go_right(),
            Action::Noop => (),
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed: f32,
    /// already collided with or scored against; resolves at most once
    pub hit: bool,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, config: &ObstacleConfig) -> Self {
        Self {
            x,
            y,
            radius: config.radius,
            speed: config.speed,
            hit: false,
        }
    }

    pub fn move_down(&mut self) {
        self.y += self.speed;
    }

    pub fn moved_down(&self) -> Obstacle {
        let mut next = self.clone();
        next.move_down();
        next
    }

    pub fn collides_with(&self, player: &Player) -> bool {
        circles_collide((self.x, self.y), self.radius, (player.x, player.y), player.radius)
    }
}

/// Circles touch when the distance between centres is at most the sum of radii.
pub fn circles_collide(a: (f32, f32), a_radius: f32, b: (f32, f32), b_radius: f32) -> bool {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let reach = a_radius + b_radius;
    dx * dx + dy * dy <= reach * reach
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_player_starts_centered_above_bottom() {
        let config = GameConfig::default();
        let player = Player::new(&config);
        assert_eq!(player.x, 150.0);
        assert_eq!(player.y, 260.0);
    }

    #[rstest]
    #[case(Action::Left, 20.0, 9.0)]
    #[case(Action::Left, 100.0, 85.0)]
    #[case(Action::Right, 280.0, 291.0)]
    #[case(Action::Right, 100.0, 115.0)]
    #[case(Action::Noop, 100.0, 100.0)]
    fn test_player_moved_saturates(#[case] action: Action, #[case] start_x: f32, #[case] expected_x: f32) {
        let mut player = Player::new(&GameConfig::default());
        player.x = start_x;
        let next = player.moved(action);
        assert_eq!(next.x, expected_x);
        assert_eq!(player.x, start_x, "moved() must not mutate the source snapshot");
    }

    #[test]
    fn test_collision_touching_counts() {
        // centres 40 apart, radii 15 + 25
        assert!(circles_collide((0.0, 0.0), 15.0, (0.0, 40.0), 25.0));
        assert!(!circles_collide((0.0, 0.0), 15.0, (0.0, 40.5), 25.0));
        assert!(circles_collide((3.0, 4.0), 2.5, (0.0, 0.0), 2.5));
    }

    #[test]
    fn test_obstacle_moved_down() {
        let obstacle = Obstacle::new(10.0, -20.0, &ObstacleConfig::default());
        let next = obstacle.moved_down();
        assert_eq!(next.y, -6.0);
        assert_eq!(obstacle.y, -20.0);
        assert!(!next.hit);
    }
}
