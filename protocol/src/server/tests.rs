#[cfg(test)]
mod tests {
    use crate::{AuthStatus, DamageCategory, ParseError, ServerMessage, parse_server_message};

    #[test]
    fn test_auth_reply_wire_format() {
        assert_eq!(
            ServerMessage::Auth(AuthStatus::Success).to_wire_format(),
            r#"{"status":"success"}"#
        );
        assert_eq!(
            ServerMessage::Auth(AuthStatus::Failure).to_wire_format(),
            r#"{"status":"failure"}"#
        );
    }

    #[test]
    fn test_parse_auth_reply() {
        let message = parse_server_message(r#"{"status":"success"}"#).unwrap();
        assert_eq!(message, ServerMessage::Auth(AuthStatus::Success));

        let message = parse_server_message(r#"{"status": "failure"}"#).unwrap();
        assert_eq!(message, ServerMessage::Auth(AuthStatus::Failure));
        assert!(message.is_terminal());
    }

    #[test]
    fn test_parse_auth_reply_invalid() {
        let result = parse_server_message(r#"{"status":"maybe"}"#);
        assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_switch_menu() {
        let line = "Choose a creature to switch to: 2. Ivysaur, 3. Venusaur";
        let message = parse_server_message(line).unwrap();

        assert_eq!(
            message,
            ServerMessage::SwitchMenu {
                options: vec![(2, "Ivysaur".to_string()), (3, "Venusaur".to_string())]
            }
        );
        assert_eq!(message.to_wire_format(), line);
    }

    #[test]
    fn test_parse_damage_reports() {
        let message = parse_server_message("You dealt 95 damage! (special)").unwrap();
        assert_eq!(
            message,
            ServerMessage::DealtDamage {
                damage: 95,
                category: DamageCategory::Special
            }
        );

        let message = parse_server_message("You received 0 damage! (normal)").unwrap();
        assert_eq!(
            message,
            ServerMessage::ReceivedDamage {
                damage: 0,
                category: DamageCategory::Normal
            }
        );
    }

    #[test]
    fn test_parse_active_creature_with_negative_hp() {
        let message = parse_server_message("Active creature: Mr. Mime (HP -12)").unwrap();
        assert_eq!(
            message,
            ServerMessage::ActiveCreature {
                name: "Mr. Mime".to_string(),
                hp: -12
            }
        );
    }

    #[test]
    fn test_parse_faint_messages() {
        assert_eq!(
            parse_server_message("Your Bulbasaur fainted!").unwrap(),
            ServerMessage::Fainted {
                name: "Bulbasaur".to_string()
            }
        );
        assert_eq!(
            parse_server_message("The opposing Charmander fainted!").unwrap(),
            ServerMessage::OpponentFainted {
                name: "Charmander".to_string()
            }
        );
    }

    #[test]
    fn test_parse_battle_start() {
        assert_eq!(
            parse_server_message("Your opponent is misty, leading with Staryu.").unwrap(),
            ServerMessage::Opponent {
                name: "misty".to_string(),
                lead: "Staryu".to_string()
            }
        );
        assert_eq!(
            parse_server_message("ash, prepare for battle!").unwrap(),
            ServerMessage::PrepareForBattle {
                name: "ash".to_string()
            }
        );
        assert_eq!(
            parse_server_message("misty moves first.").unwrap(),
            ServerMessage::TurnOrder {
                first: "misty".to_string()
            }
        );
    }

    #[test]
    fn test_parse_roster_prompts() {
        assert_eq!(
            parse_server_message(&ServerMessage::ChooseRoster { size: 3 }.to_wire_format())
                .unwrap(),
            ServerMessage::ChooseRoster { size: 3 }
        );
        assert_eq!(
            parse_server_message("Creature with ID 999 not found. Please try again.").unwrap(),
            ServerMessage::UnknownCreature {
                id: "999".to_string()
            }
        );
        assert_eq!(
            parse_server_message("Your team: Bulbasaur, Ivysaur, Venusaur").unwrap(),
            ServerMessage::RosterAccepted {
                names: vec![
                    "Bulbasaur".to_string(),
                    "Ivysaur".to_string(),
                    "Venusaur".to_string()
                ]
            }
        );
    }

    #[test]
    fn test_terminal_messages() {
        for message in [
            ServerMessage::Win,
            ServerMessage::Lose,
            ServerMessage::OpponentDisconnected,
            ServerMessage::TimedOut,
            ServerMessage::TooManyAttempts,
        ] {
            let parsed = parse_server_message(&message.to_wire_format()).unwrap();
            assert_eq!(parsed, message);
            assert!(parsed.is_terminal());
        }

        assert!(!ServerMessage::ChooseAction.is_terminal());
        assert!(!ServerMessage::Auth(AuthStatus::Success).is_terminal());
    }

    #[test]
    fn test_parse_unknown() {
        let line = "something the server never says";
        let message = parse_server_message(line).unwrap();

        assert_eq!(message, ServerMessage::Raw(line.to_string()));
    }

    #[test]
    fn test_parse_empty() {
        let message = parse_server_message("").unwrap();

        assert_eq!(message, ServerMessage::Raw("".to_string()));
    }
}
