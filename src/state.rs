// This library is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this library.  If not, see <http://www.gnu.org/licenses/>.
//! Two-state flags shared by the whole clock.

/// Named on/off tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Disable,
    Enable,
}

impl State {
    pub fn is_enabled(self) -> bool {
        self == State::Enable
    }

    pub fn toggled(self) -> Self {
        match self {
            State::Disable => State::Enable,
            State::Enable => State::Disable,
        }
    }
}

impl From<bool> for State {
    fn from(enabled: bool) -> Self {
        if enabled {
            State::Enable
        } else {
            State::Disable
        }
    }
}

/// Runtime flags. Each one toggles on its own schedule: the voltage flag
/// follows power sequencing, the display flag follows blanking and the user,
/// the alarm flag follows the alarm state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeState {
    pub voltage: State,
    pub display: State,
    pub alarm: State,
}
