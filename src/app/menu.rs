use crate::app::{AppCommand, AppEvent, ListAction, ListEntry, SelectList, SharedContext, StageTag};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MenuItem {
    pub title: &'static str,
    pub description: &'static str,
    pub target: StageTag,
}

impl ListEntry for MenuItem {
    fn title(&self) -> &str {
        self.title
    }

    fn description(&self) -> &str {
        self.description
    }
}

pub const MENU_ITEMS: [MenuItem; 4] = [
    MenuItem {
        title: "Settings",
        description: "Credentials, accounts and project",
        target: StageTag::Settings,
    },
    MenuItem {
        title: "Open Orders",
        description: "List open orders for a market",
        target: StageTag::OpenOrders,
    },
    MenuItem {
        title: "Orderbook",
        description: "Show bids and asks for a market",
        target: StageTag::Orderbook,
    },
    MenuItem {
        title: "Quit",
        description: "Leave the trader",
        target: StageTag::Exit,
    },
];

#[derive(Clone, Debug)]
pub struct MenuStage {
    pub list: SelectList<MenuItem>,
}

impl MenuStage {
    pub fn new() -> Self {
        Self {
            list: SelectList::new("Menu", MENU_ITEMS.to_vec()),
        }
    }

    pub fn init(&mut self, ctx: &SharedContext) -> AppCommand {
        let (width, height) = ctx.viewport;
        self.list.set_size(width, height);
        AppCommand::None
    }

    pub fn update(mut self, event: &AppEvent) -> (StageTag, Self, AppCommand) {
        let next = match event {
            AppEvent::Resize { width, height } => {
                self.list.set_size(*width, *height);
                StageTag::Menu
            }
            AppEvent::Key(key) => match self.list.handle_key(key) {
                ListAction::Choose(index) => self
                    .list
                    .items()
                    .get(index)
                    .map_or(StageTag::Menu, |item| item.target),
                ListAction::Quit => StageTag::Exit,
                ListAction::None => StageTag::Menu,
            },
            AppEvent::Task(_) | AppEvent::Fatal(_) => StageTag::Menu,
        };
        (next, self, AppCommand::None)
    }
}
